#![allow(dead_code)]

use architect_actions::{load_from_str, resolve, MemoryEngine, ModelRegistry, ModelSchema, RequestContext};
use serde_json::Value;
use std::sync::Arc;

pub const MODELS: &str = r#"{
  "models": [
    {
      "name": "users",
      "primary_key": "user_id",
      "fields": [
        { "name": "user_id", "type": "uuid", "nullable": false },
        { "name": "name", "type": "text", "nullable": false },
        { "name": "admin", "type": "boolean", "default": false },
        { "name": "invited_by", "type": "text" },
        { "name": "created_at", "type": "timestamptz" },
        { "name": "updated_at", "type": "timestamptz" }
      ]
    },
    {
      "name": "things",
      "primary_key": "thing_id",
      "fields": [
        { "name": "thing_id", "type": "text", "nullable": false },
        { "name": "user_id", "type": "text", "nullable": false },
        { "name": "title", "type": "text", "nullable": false },
        { "name": "rank", "type": "integer" },
        { "name": "active", "type": "boolean", "default": true }
      ]
    }
  ]
}"#;

pub fn registry() -> ModelRegistry {
    resolve(&load_from_str(MODELS).expect("models parse")).expect("models resolve")
}

pub struct Fixture {
    pub store: Arc<MemoryEngine>,
    pub users: Arc<ModelSchema>,
    pub things: Arc<ModelSchema>,
}

impl Fixture {
    pub fn new() -> Self {
        let registry = registry();
        Fixture {
            store: Arc::new(MemoryEngine::new()),
            users: registry.require("users").expect("users"),
            things: registry.require("things").expect("things"),
        }
    }

    /// Seed things owned by u1 and u2; t3 is inactive.
    pub fn with_things(self) -> Self {
        self.store
            .seed(
                &self.things,
                [
                    serde_json::json!({ "thing_id": "t1", "user_id": "u1", "title": "first", "rank": 2, "active": "1" }),
                    serde_json::json!({ "thing_id": "t2", "user_id": "u1", "title": "second", "rank": 1, "active": "1" }),
                    serde_json::json!({ "thing_id": "t3", "user_id": "u1", "title": "third", "rank": 3, "active": "0" }),
                    serde_json::json!({ "thing_id": "t4", "user_id": "u2", "title": "other", "rank": 1, "active": "1" }),
                ],
            )
            .expect("seed");
        self
    }

    pub fn ctx(&self, params: &[(&str, &str)], body: Option<Value>) -> RequestContext {
        let mut builder = RequestContext::builder(self.store.clone());
        for (k, v) in params {
            builder = builder.param(*k, *v);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        builder.build()
    }
}
