//! Resource routes: list/create on the collection path, fetch/update/delete on the member path.
//! Nested resources put the parent's parameter in the collection path, e.g.
//! `/users/:user_id/things`, which then scopes every action through the route parameters.

use crate::adapter::{self, AxumAdapter, AxumRequest};
use crate::shape::Shaped;
use axum::body::Bytes;
use axum::extract::Path;
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Resource {
    path: String,
    id_param: String,
    list: Option<Shaped>,
    create: Option<Shaped>,
    fetch: Option<Shaped>,
    update: Option<Shaped>,
    delete: Option<Shaped>,
}

impl Resource {
    /// `path` is the collection path; the member path appends `/:id_param`.
    pub fn new(path: impl Into<String>, id_param: impl Into<String>) -> Self {
        Resource {
            path: path.into(),
            id_param: id_param.into(),
            list: None,
            create: None,
            fetch: None,
            update: None,
            delete: None,
        }
    }

    pub fn list(mut self, action: impl Into<Shaped>) -> Self {
        self.list = Some(action.into());
        self
    }

    pub fn create(mut self, action: impl Into<Shaped>) -> Self {
        self.create = Some(action.into());
        self
    }

    pub fn fetch(mut self, action: impl Into<Shaped>) -> Self {
        self.fetch = Some(action.into());
        self
    }

    /// Served on both PATCH and PUT.
    pub fn update(mut self, action: impl Into<Shaped>) -> Self {
        self.update = Some(action.into());
        self
    }

    pub fn delete(mut self, action: impl Into<Shaped>) -> Self {
        self.delete = Some(action.into());
        self
    }

    pub fn collection_path(&self) -> &str {
        &self.path
    }

    pub fn member_path(&self) -> String {
        format!("{}/:{}", self.path.trim_end_matches('/'), self.id_param)
    }

    pub fn router(self, adapter: AxumAdapter) -> Router {
        let adapter = Arc::new(adapter);
        let member_path = self.member_path();

        let collection = [(MethodFilter::GET, self.list), (MethodFilter::POST, self.create)];
        let member = [
            (MethodFilter::GET, self.fetch),
            (MethodFilter::PATCH.or(MethodFilter::PUT), self.update),
            (MethodFilter::DELETE, self.delete),
        ];

        let mut router = Router::new();
        if let Some(routes) = mount(&adapter, collection) {
            router = router.route(&self.path, routes);
        }
        if let Some(routes) = mount(&adapter, member) {
            router = router.route(&member_path, routes);
        }
        router
    }
}

fn mount<const N: usize>(
    adapter: &Arc<AxumAdapter>,
    actions: [(MethodFilter, Option<Shaped>); N],
) -> Option<MethodRouter> {
    actions
        .into_iter()
        .filter_map(|(filter, shaped)| shaped.map(|s| endpoint(filter, adapter.clone(), Arc::new(s))))
        .reduce(|acc, next| acc.merge(next))
}

fn endpoint(filter: MethodFilter, adapter: Arc<AxumAdapter>, shaped: Arc<Shaped>) -> MethodRouter {
    on(filter, move |params: Option<Path<HashMap<String, String>>>, body: Bytes| {
        let adapter = adapter.clone();
        let shaped = shaped.clone();
        async move {
            let request = AxumRequest {
                params: params.map(|Path(p)| p).unwrap_or_default(),
                body,
            };
            adapter::handle(adapter.as_ref(), &shaped, request).await
        }
    })
}
