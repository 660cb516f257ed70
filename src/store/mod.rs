//! Data-access capability required by the actions, plus the PostgreSQL and in-memory engines.

mod memory;
mod postgres;

pub use memory::MemoryEngine;
pub use postgres::PgEngine;

use crate::attributes::ResolvedRecord;
use crate::config::ModelSchema;
use crate::error::AppError;
use crate::query::Query;
use async_trait::async_trait;
use serde_json::Value;

/// What an insert does when it hits a unique conflict.
#[derive(Clone, Debug, PartialEq)]
pub enum ConflictAction {
    DoNothing,
    /// Overwrite these fields from the proposed row; empty means every inserted non-target field.
    DoUpdate(Vec<String>),
}

/// `ON CONFLICT` clause for create. Empty target means the primary key.
///
/// ```ignore
/// OnConflict::on(["email"]).merge();
/// OnConflict::on_primary_key().ignore();
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct OnConflict {
    pub target: Vec<String>,
    pub action: ConflictAction,
}

impl OnConflict {
    pub fn on<I, S>(target: I) -> OnConflictBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OnConflictBuilder {
            target: target.into_iter().map(Into::into).collect(),
        }
    }

    pub fn on_primary_key() -> OnConflictBuilder {
        OnConflictBuilder { target: Vec::new() }
    }

    /// Conflict columns, falling back to the model's primary key.
    pub fn target_for<'a>(&'a self, model: &'a ModelSchema) -> &'a [String] {
        if self.target.is_empty() {
            &model.primary_key
        } else {
            &self.target
        }
    }
}

pub struct OnConflictBuilder {
    target: Vec<String>,
}

impl OnConflictBuilder {
    /// `DO NOTHING`
    pub fn ignore(self) -> OnConflict {
        OnConflict {
            target: self.target,
            action: ConflictAction::DoNothing,
        }
    }

    /// `DO UPDATE` of every inserted field outside the target.
    pub fn merge(self) -> OnConflict {
        OnConflict {
            target: self.target,
            action: ConflictAction::DoUpdate(Vec::new()),
        }
    }

    /// `DO UPDATE` of the named fields only.
    pub fn merge_fields<I, S>(self, fields: I) -> OnConflict
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OnConflict {
            target: self.target,
            action: ConflictAction::DoUpdate(fields.into_iter().map(Into::into).collect()),
        }
    }
}

/// A relational store handle. Rows come back as JSON objects keyed by field name.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Rows matching every filter, honoring ordering, limit and offset.
    async fn select(&self, query: &Query) -> Result<Vec<Value>, AppError>;

    /// Insert one row and return it as stored. None when a `DO NOTHING` conflict skipped the insert.
    async fn insert(
        &self,
        model: &ModelSchema,
        record: &ResolvedRecord,
        on_conflict: Option<&OnConflict>,
    ) -> Result<Option<Value>, AppError>;

    /// Apply `record` to every row matching the query filters and return the updated rows.
    async fn update(&self, query: &Query, record: &ResolvedRecord) -> Result<Vec<Value>, AppError>;

    /// Delete every row matching the query filters and return how many went.
    async fn delete(&self, query: &Query) -> Result<u64, AppError>;

    /// First row of the query, if any.
    async fn select_first(&self, query: &Query) -> Result<Option<Value>, AppError> {
        let query = query.clone().limit(1);
        Ok(self.select(&query).await?.into_iter().next())
    }
}
