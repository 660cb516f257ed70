use crate::adapter::Adapter;
use crate::error::AppError;
use crate::response::Reply;
use crate::store::QueryEngine;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Path parameters and raw body as extracted by an axum handler.
#[derive(Debug, Default)]
pub struct AxumRequest {
    pub params: HashMap<String, String>,
    pub body: Bytes,
}

/// Every request shares one engine.
#[derive(Clone)]
pub struct AxumAdapter {
    engine: Arc<dyn QueryEngine>,
}

impl AxumAdapter {
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        AxumAdapter { engine }
    }
}

#[async_trait]
impl Adapter for AxumAdapter {
    type Request = AxumRequest;
    type Response = Response;

    fn use_store(&self, _request: &AxumRequest) -> Arc<dyn QueryEngine> {
        self.engine.clone()
    }

    fn route_params(&self, request: &AxumRequest) -> HashMap<String, String> {
        request.params.clone()
    }

    async fn request_body(&self, request: &mut AxumRequest) -> Result<Option<Value>, AppError> {
        if request.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&request.body)
            .map(Some)
            .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))
    }

    fn respond(&self, reply: Reply) -> Response {
        match reply.body {
            Some(body) => (reply.status, Json(body)).into_response(),
            None => reply.status.into_response(),
        }
    }

    fn fail(&self, error: AppError) -> Response {
        error.into_response()
    }
}
