//! Response shaping: omit, pick, render and status, applied per record.

use crate::actions::{Action, ActionOutput};
use crate::attributes::Arguments;
use crate::context::RequestContext;
use crate::error::AppError;
use crate::response::{Envelope, Reply};
use axum::http::StatusCode;
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

pub type RenderFn = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, AppError>> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ShapeOptions {
    pub omit: Vec<String>,
    pub pick: Option<Vec<String>>,
    pub render: Option<RenderFn>,
    /// Overrides the default 200.
    pub status: Option<StatusCode>,
}

impl ShapeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn omit<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.omit = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn pick<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pick = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn render<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, AppError>> + Send + 'static,
    {
        self.render = Some(Arc::new(move |v| f(v).boxed()));
        self
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    async fn shape_record(&self, mut record: Value) -> Result<Value, AppError> {
        if let Value::Object(map) = &mut record {
            for field in &self.omit {
                map.remove(field);
            }
            if let Some(pick) = &self.pick {
                map.retain(|k, _| pick.iter().any(|p| p == k));
            }
        }
        match &self.render {
            Some(render) => render(record).await,
            None => Ok(record),
        }
    }
}

impl std::fmt::Debug for ShapeOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapeOptions")
            .field("omit", &self.omit)
            .field("pick", &self.pick)
            .field("render", &self.render.is_some())
            .field("status", &self.status)
            .finish()
    }
}

/// Turn an action's output into a reply. Collection elements are shaped concurrently;
/// their order is kept.
pub async fn shape(output: ActionOutput, options: &ShapeOptions) -> Result<Reply, AppError> {
    Ok(match output {
        ActionOutput::Record(record) => {
            let data = options.shape_record(record).await?;
            Reply::json(options.status.unwrap_or(StatusCode::OK), Envelope::single(data))
        }
        ActionOutput::Collection(rows) => {
            let data = try_join_all(rows.into_iter().map(|row| options.shape_record(row))).await?;
            Reply::json(options.status.unwrap_or(StatusCode::OK), Envelope::collection(data))
        }
        ActionOutput::Empty => Reply::empty(options.status.unwrap_or(StatusCode::OK)),
    })
}

/// An action composed with a shaper: the unit a route handler runs.
#[derive(Clone, Debug)]
pub struct Shaped {
    action: Action,
    options: ShapeOptions,
}

impl Shaped {
    pub fn new(action: Action, options: ShapeOptions) -> Self {
        Shaped { action, options }
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub async fn handle(&self, ctx: &RequestContext) -> Result<Reply, AppError> {
        self.handle_with(ctx, None).await
    }

    pub async fn handle_with(&self, ctx: &RequestContext, args: Option<&Arguments>) -> Result<Reply, AppError> {
        let output = self.action.run_with(ctx, args).await?;
        shape(output, &self.options).await
    }
}

impl From<Action> for Shaped {
    fn from(action: Action) -> Self {
        Shaped::new(action, ShapeOptions::default())
    }
}
