//! Request-scoped context threaded through every action step.
//!
//! Holds the decoded route parameters, the raw inbound payload, the store handle for this
//! request and a key/value store ("locals") used to pass loaded records between composed steps.
//! Cloning is cheap and clones share the same locals.

use crate::store::QueryEngine;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    store: Arc<dyn QueryEngine>,
    params: HashMap<String, String>,
    body: Option<Value>,
    locals: RwLock<HashMap<String, Value>>,
}

impl RequestContext {
    pub fn new(store: Arc<dyn QueryEngine>) -> Self {
        Self::builder(store).build()
    }

    pub fn builder(store: Arc<dyn QueryEngine>) -> RequestContextBuilder {
        RequestContextBuilder {
            store,
            params: HashMap::new(),
            body: None,
            locals: HashMap::new(),
        }
    }

    /// Store handle scoped to this request.
    pub fn store(&self) -> &Arc<dyn QueryEngine> {
        &self.inner.store
    }

    /// Decoded path parameters.
    pub fn route_params(&self) -> &HashMap<String, String> {
        &self.inner.params
    }

    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.inner.params.get(name).map(String::as_str)
    }

    /// Raw inbound payload, if the request carried one.
    pub fn body(&self) -> Option<&Value> {
        self.inner.body.as_ref()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        match self.inner.locals.read() {
            Ok(locals) => locals.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        let mut locals = match self.inner.locals.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locals.insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("params", &self.inner.params)
            .field("body", &self.inner.body)
            .finish_non_exhaustive()
    }
}

pub struct RequestContextBuilder {
    store: Arc<dyn QueryEngine>,
    params: HashMap<String, String>,
    body: Option<Value>,
    locals: HashMap<String, Value>,
}

impl RequestContextBuilder {
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn params(mut self, params: HashMap<String, String>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn local(mut self, key: impl Into<String>, value: Value) -> Self {
        self.locals.insert(key.into(), value);
        self
    }

    pub fn build(self) -> RequestContext {
        RequestContext {
            inner: Arc::new(ContextInner {
                store: self.store,
                params: self.params,
                body: self.body,
                locals: RwLock::new(self.locals),
            }),
        }
    }
}
