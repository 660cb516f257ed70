//! HTTP surface: resources mounted as axum routes.

mod resource;

pub use resource::Resource;

use crate::adapter::AxumAdapter;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Merge resources into one router sharing an adapter, with a request body size cap.
pub fn app(resources: impl IntoIterator<Item = Resource>, adapter: AxumAdapter, body_limit: usize) -> Router {
    resources
        .into_iter()
        .fold(Router::new(), |router, resource| router.merge(resource.router(adapter.clone())))
        .layer(RequestBodyLimitLayer::new(body_limit))
}
