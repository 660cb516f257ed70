//! Scope and predicate composition: route-parameter scopes, then `where`, then the query hook.

use crate::attributes::encode_value;
use crate::config::ModelSchema;
use crate::context::RequestContext;
use crate::error::AppError;
use crate::query::{Operator, Predicate, Query};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

pub type WhereFn = Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Result<Vec<Predicate>, AppError>> + Send + Sync>;
pub type QueryHook = Arc<dyn Fn(RequestContext, Query) -> BoxFuture<'static, Result<Query, AppError>> + Send + Sync>;

#[derive(Clone)]
pub enum WhereClause {
    Static(Vec<Predicate>),
    Dynamic(WhereFn),
}

/// Options shared by list, fetch, load, update and delete.
#[derive(Clone, Default)]
pub struct LoadOptions {
    /// Route parameters treated as equality filters. None means all of them.
    pub scopes: Option<Vec<String>>,
    pub where_: Option<WhereClause>,
    pub query: Option<QueryHook>,
    /// Contextual-store key for the loaded record. Defaults to the model's singular name.
    pub as_: Option<String>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, predicates: Vec<Predicate>) -> Self {
        self.where_ = Some(WhereClause::Static(predicates));
        self
    }

    pub fn filter_with<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Predicate>, AppError>> + Send + 'static,
    {
        self.where_ = Some(WhereClause::Dynamic(Arc::new(move |ctx| f(ctx).boxed())));
        self
    }

    pub fn query<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestContext, Query) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Query, AppError>> + Send + 'static,
    {
        self.query = Some(Arc::new(move |ctx, q| f(ctx, q).boxed()));
        self
    }

    pub fn as_name(mut self, name: impl Into<String>) -> Self {
        self.as_ = Some(name.into());
        self
    }

    /// Key under which a loaded record of `model` is cached for this request.
    pub fn cache_key<'a>(&'a self, model: &'a ModelSchema) -> &'a str {
        self.as_.as_deref().unwrap_or(&model.singular)
    }
}

impl std::fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let where_ = match &self.where_ {
            None => "none".to_string(),
            Some(WhereClause::Static(p)) => format!("{:?}", p),
            Some(WhereClause::Dynamic(_)) => "fn".to_string(),
        };
        f.debug_struct("LoadOptions")
            .field("scopes", &self.scopes)
            .field("where", &where_)
            .field("query", &self.query.is_some())
            .field("as", &self.as_)
            .finish()
    }
}

/// Apply scopes, `where` and the query hook to `base`, in that order.
pub async fn compose(ctx: &RequestContext, options: &LoadOptions, base: Query) -> Result<Query, AppError> {
    let mut query = base;

    let mut params: Vec<(&String, &String)> = ctx.route_params().iter().collect();
    params.sort_by(|a, b| a.0.cmp(b.0));
    for (name, raw) in params {
        if let Some(scopes) = &options.scopes {
            if !scopes.iter().any(|s| s == name) {
                continue;
            }
        }
        let Some(field) = query.model.field(name) else {
            tracing::trace!(param = %name, model = %query.model.name, "route parameter is not a field, not scoping");
            continue;
        };
        query = match field.field_type.coerce_param(raw) {
            Ok(value) => query.where_eq(name.clone(), encode_value(value)),
            // No row can hold the value; match nothing instead of asking the store to cast it.
            Err(reason) => {
                tracing::debug!(
                    param = %name,
                    model = %query.model.name,
                    reason = %reason,
                    "route parameter matches no row"
                );
                query.filter(Predicate::new(name.clone(), Operator::In, Value::Array(Vec::new())))
            }
        };
    }

    let predicates = match &options.where_ {
        None => Vec::new(),
        Some(WhereClause::Static(list)) => list.clone(),
        Some(WhereClause::Dynamic(f)) => f(ctx.clone()).await?,
    };
    for mut p in predicates {
        p.value = match (p.op, p.value) {
            (Operator::In | Operator::NotIn, Value::Array(items)) => {
                Value::Array(items.into_iter().map(encode_value).collect())
            }
            (_, v) => encode_value(v),
        };
        query = query.filter(p);
    }

    if let Some(hook) = &options.query {
        query = hook(ctx.clone(), query).await?;
    }
    Ok(query)
}
