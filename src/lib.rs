//! Architect actions: declarative list/create/fetch/update/delete over configured models.

pub mod actions;
pub mod adapter;
pub mod attributes;
pub mod config;
pub mod context;
pub mod error;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod shape;
pub mod sql;
pub mod store;

pub use actions::{Action, ActionOutput, CreateOptions, UpdateOptions};
pub use adapter::{Adapter, AxumAdapter};
pub use attributes::{AttributeSource, AttributeSpec, TimestampKind};
pub use config::{load_from_dir, load_from_str, resolve, ModelRegistry, ModelSchema, Settings};
pub use context::RequestContext;
pub use error::{AppError, ConfigError};
pub use query::{LoadOptions, Operator, Predicate, Query};
pub use response::{Envelope, Reply};
pub use routes::{app, Resource};
pub use shape::{ShapeOptions, Shaped};
pub use store::{MemoryEngine, OnConflict, PgEngine, QueryEngine};
