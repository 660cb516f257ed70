use crate::actions::{Action, ActionKind, ActionOutput};
use crate::attributes::{resolve, Arguments};
use crate::context::RequestContext;
use crate::error::AppError;
use crate::query::{compose, Query};
use crate::service::ValidationMode;
use serde_json::Value;

impl Action {
    pub async fn run(&self, ctx: &RequestContext) -> Result<ActionOutput, AppError> {
        self.run_with(ctx, None).await
    }

    /// Run with an argument bag for `Argument`-sourced attributes.
    pub async fn run_with(&self, ctx: &RequestContext, args: Option<&Arguments>) -> Result<ActionOutput, AppError> {
        tracing::debug!(action = self.name(), model = %self.model.name, "running action");
        match &self.kind {
            ActionKind::List => {
                let query = self.scoped_query(ctx).await?;
                let rows = ctx.store().select(&query).await?;
                Ok(ActionOutput::Collection(rows))
            }
            ActionKind::Create {
                attributes,
                on_conflict,
            } => {
                let record = resolve(ctx, &self.model, ctx.body(), attributes, args, ValidationMode::Full).await?;
                let row = ctx
                    .store()
                    .insert(&self.model, &record, on_conflict.as_ref())
                    .await?;
                if row.is_none() {
                    tracing::debug!(model = %self.model.name, "insert skipped by conflict clause");
                }
                Ok(ActionOutput::Record(row.unwrap_or(Value::Null)))
            }
            ActionKind::Fetch => Ok(ActionOutput::Record(self.cached_or_load(ctx, None).await?)),
            ActionKind::Load => {
                let record = self.cached_or_load(ctx, None).await?;
                ctx.set(self.load.cache_key(&self.model), record.clone());
                Ok(ActionOutput::Record(record))
            }
            ActionKind::Update { attributes } => {
                let query = self.scoped_query(ctx).await?;
                let record = resolve(ctx, &self.model, ctx.body(), attributes, args, ValidationMode::Partial).await?;
                let rows = ctx.store().update(&query, &record).await?;
                rows.into_iter()
                    .next()
                    .map(ActionOutput::Record)
                    .ok_or_else(|| self.not_found())
            }
            ActionKind::Delete => {
                let query = self.scoped_query(ctx).await?;
                self.cached_or_load(ctx, Some(&query)).await?;
                match ctx.store().delete(&query).await? {
                    0 => Err(self.not_found()),
                    _ => Ok(ActionOutput::Empty),
                }
            }
        }
    }

    async fn scoped_query(&self, ctx: &RequestContext) -> Result<Query, AppError> {
        compose(ctx, &self.load, Query::select_all(self.model.clone())).await
    }

    /// Record cached under the singular name, else the first row of the scoped query.
    async fn cached_or_load(&self, ctx: &RequestContext, query: Option<&Query>) -> Result<Value, AppError> {
        let key = self.load.cache_key(&self.model);
        if let Some(record) = ctx.get(key).filter(|v| !v.is_null()) {
            tracing::debug!(model = %self.model.name, key, "reusing cached record");
            return Ok(record);
        }
        let row = match query {
            Some(q) => ctx.store().select_first(q).await?,
            None => ctx.store().select_first(&self.scoped_query(ctx).await?).await?,
        };
        row.ok_or_else(|| self.not_found())
    }

    fn not_found(&self) -> AppError {
        AppError::NotFound(format!("{} not found", self.model.singular))
    }
}
