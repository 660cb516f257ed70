//! Framework adapter contract: how a web framework's request becomes a [`RequestContext`]
//! and how a [`Reply`] goes back out.

mod web;

pub use web::{AxumAdapter, AxumRequest};

use crate::context::RequestContext;
use crate::error::AppError;
use crate::response::Reply;
use crate::shape::Shaped;
use crate::store::QueryEngine;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Adapter: Send + Sync {
    type Request: Send;
    type Response;

    /// Store handle for this request.
    fn use_store(&self, request: &Self::Request) -> Arc<dyn QueryEngine>;

    /// Decoded path parameters.
    fn route_params(&self, request: &Self::Request) -> HashMap<String, String>;

    /// Parsed payload; None when the request has no body.
    async fn request_body(&self, request: &mut Self::Request) -> Result<Option<Value>, AppError>;

    fn respond(&self, reply: Reply) -> Self::Response;

    fn fail(&self, error: AppError) -> Self::Response;

    async fn context(&self, mut request: Self::Request) -> Result<RequestContext, AppError> {
        let store = self.use_store(&request);
        let params = self.route_params(&request);
        let mut builder = RequestContext::builder(store).params(params);
        if let Some(body) = self.request_body(&mut request).await? {
            builder = builder.body(body);
        }
        Ok(builder.build())
    }
}

/// Run a shaped action for one framework request.
pub async fn handle<A: Adapter>(adapter: &A, shaped: &Shaped, request: A::Request) -> A::Response {
    let result = async {
        let ctx = adapter.context(request).await?;
        shaped.handle(&ctx).await
    }
    .await;
    match result {
        Ok(reply) => adapter.respond(reply),
        Err(err) => {
            tracing::debug!(action = shaped.action().name(), error = %err, "action failed");
            adapter.fail(err)
        }
    }
}
