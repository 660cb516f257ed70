//! Resource actions: list, create, fetch, load, update, delete.
//!
//! An [`Action`] is built once per (model, options) pair and run against any number of
//! request contexts. Each run is strictly sequential: attribute resolution and scope
//! composition, one store call, not-found detection.

mod run;

use crate::attributes::AttributeSpec;
use crate::config::ModelSchema;
use crate::query::LoadOptions;
use crate::shape::{ShapeOptions, Shaped};
use crate::store::OnConflict;
use serde_json::Value;
use std::sync::Arc;

/// What an action produced, before shaping.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionOutput {
    Record(Value),
    Collection(Vec<Value>),
    Empty,
}

#[derive(Clone, Debug, Default)]
pub struct CreateOptions {
    pub attributes: AttributeSpec,
    pub on_conflict: Option<OnConflict>,
}

impl CreateOptions {
    pub fn new(attributes: AttributeSpec) -> Self {
        CreateOptions {
            attributes,
            on_conflict: None,
        }
    }

    pub fn on_conflict(mut self, clause: OnConflict) -> Self {
        self.on_conflict = Some(clause);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct UpdateOptions {
    pub load: LoadOptions,
    pub attributes: AttributeSpec,
}

impl UpdateOptions {
    pub fn new(attributes: AttributeSpec) -> Self {
        UpdateOptions {
            load: LoadOptions::default(),
            attributes,
        }
    }

    pub fn load(mut self, load: LoadOptions) -> Self {
        self.load = load;
        self
    }
}

#[derive(Clone, Debug)]
enum ActionKind {
    List,
    Create {
        attributes: AttributeSpec,
        on_conflict: Option<OnConflict>,
    },
    Fetch,
    Load,
    Update {
        attributes: AttributeSpec,
    },
    Delete,
}

#[derive(Clone, Debug)]
pub struct Action {
    model: Arc<ModelSchema>,
    kind: ActionKind,
    load: LoadOptions,
}

impl Action {
    fn new(model: Arc<ModelSchema>, kind: ActionKind, load: LoadOptions) -> Self {
        Action { model, kind, load }
    }

    pub fn model(&self) -> &Arc<ModelSchema> {
        &self.model
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            ActionKind::List => "list",
            ActionKind::Create { .. } => "create",
            ActionKind::Fetch => "fetch",
            ActionKind::Load => "load",
            ActionKind::Update { .. } => "update",
            ActionKind::Delete => "delete",
        }
    }

    /// Pair with a response shaper.
    pub fn shaped(self, options: ShapeOptions) -> Shaped {
        Shaped::new(self, options)
    }
}

/// Every matching row, wrapped as a collection.
pub fn list(model: Arc<ModelSchema>, options: LoadOptions) -> Action {
    Action::new(model, ActionKind::List, options)
}

/// Insert one resolved record and return it.
pub fn create(model: Arc<ModelSchema>, options: CreateOptions) -> Action {
    Action::new(
        model,
        ActionKind::Create {
            attributes: options.attributes,
            on_conflict: options.on_conflict,
        },
        LoadOptions::default(),
    )
}

/// The cached record under the singular name, else the first scoped match.
pub fn fetch(model: Arc<ModelSchema>, options: LoadOptions) -> Action {
    Action::new(model, ActionKind::Fetch, options)
}

/// Like [`fetch`], and leaves the record in the request context for later steps.
pub fn load(model: Arc<ModelSchema>, options: LoadOptions) -> Action {
    Action::new(model, ActionKind::Load, options)
}

pub fn update(model: Arc<ModelSchema>, options: UpdateOptions) -> Action {
    Action::new(
        model,
        ActionKind::Update {
            attributes: options.attributes,
        },
        options.load,
    )
}

pub fn delete(model: Arc<ModelSchema>, options: LoadOptions) -> Action {
    Action::new(model, ActionKind::Delete, options)
}
