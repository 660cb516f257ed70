//! In-process tables evaluating the same filters as the PostgreSQL engine.

use crate::attributes::{encode_value, FieldValue, ResolvedRecord};
use crate::config::{FieldType, ModelSchema};
use crate::error::AppError;
use crate::query::{compare, Direction, Query};
use crate::store::{ConflictAction, OnConflict, QueryEngine};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type Row = Map<String, Value>;

#[derive(Default)]
pub struct MemoryEngine {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

fn table_key(model: &ModelSchema) -> String {
    match &model.schema_name {
        Some(schema) => format!("{}.{}", schema, model.table_name),
        None => model.table_name.clone(),
    }
}

/// Configured default, stored the same way resolved values are.
fn column_default(model: &ModelSchema, field: &str) -> Value {
    model
        .field(field)
        .and_then(|f| f.default.clone())
        .map(encode_value)
        .unwrap_or(Value::Null)
}

/// A stored row as PostgreSQL would return it: boolean columns decode back to JSON booleans.
fn present(model: &ModelSchema, row: &Row) -> Value {
    let mut out = row.clone();
    for field in model.fields.iter().filter(|f| f.field_type == FieldType::Boolean) {
        if let Some(v) = out.get_mut(&field.name) {
            let decoded = match v.as_str() {
                Some("1") => Some(true),
                Some("0") => Some(false),
                _ => None,
            };
            if let Some(b) = decoded {
                *v = Value::Bool(b);
            }
        }
    }
    Value::Object(out)
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows as-is, bypassing defaults and conflict checks.
    pub fn seed(&self, model: &ModelSchema, rows: impl IntoIterator<Item = Value>) -> Result<(), AppError> {
        let mut tables = self.write()?;
        let table = tables.entry(table_key(model)).or_default();
        for row in rows {
            match row {
                Value::Object(map) => table.push(map),
                other => return Err(AppError::Store(format!("seed row must be an object, got {}", other))),
            }
        }
        Ok(())
    }

    /// Current contents of a model's table, in insertion order.
    pub fn rows(&self, model: &ModelSchema) -> Vec<Value> {
        self.read()
            .map(|tables| {
                tables
                    .get(&table_key(model))
                    .map(|rows| rows.iter().cloned().map(Value::Object).collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Vec<Row>>>, AppError> {
        self.tables.read().map_err(|_| AppError::Store("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Vec<Row>>>, AppError> {
        self.tables.write().map_err(|_| AppError::Store("memory store lock poisoned".into()))
    }

    fn apply(model: &ModelSchema, row: &mut Row, record: &ResolvedRecord) {
        for (field, value) in record.iter() {
            let v = match value {
                FieldValue::Set(v) => v.clone(),
                FieldValue::Default => column_default(model, field),
            };
            row.insert(field.to_string(), v);
        }
    }
}

fn matches(query: &Query, row: &Row) -> bool {
    query.filters.iter().all(|p| p.matches(row))
}

fn conflicts(existing: &Row, proposed: &Row, target: &[String]) -> bool {
    !target.is_empty()
        && target.iter().all(|col| match (existing.get(col), proposed.get(col)) {
            (Some(a), Some(b)) => compare(a, b) == Some(Ordering::Equal),
            _ => false,
        })
}

#[async_trait]
impl QueryEngine for MemoryEngine {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, AppError> {
        query.ensure_known_fields()?;
        let tables = self.read()?;
        let mut rows: Vec<&Row> = tables
            .get(&table_key(&query.model))
            .map(|rows| rows.iter().filter(|r| matches(query, r)).collect())
            .unwrap_or_default();

        // Unordered queries fall back to the primary key, as the SQL builder does.
        let order: Vec<(&str, Direction)> = if query.order_by.is_empty() {
            query.model.primary_key.iter().map(|k| (k.as_str(), Direction::Asc)).collect()
        } else {
            query.order_by.iter().map(|o| (o.field.as_str(), o.direction)).collect()
        };
        rows.sort_by(|a, b| {
            for (field, direction) in &order {
                let ord = match (a.get(*field), b.get(*field)) {
                    (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                };
                let ord = match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map(|n| n as usize).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|r| present(&query.model, r))
            .collect())
    }

    async fn insert(
        &self,
        model: &ModelSchema,
        record: &ResolvedRecord,
        on_conflict: Option<&OnConflict>,
    ) -> Result<Option<Value>, AppError> {
        let mut row = Row::new();
        for field in model.field_names() {
            row.insert(field.to_string(), column_default(model, field));
        }
        Self::apply(model, &mut row, record);

        let mut tables = self.write()?;
        let table = tables.entry(table_key(model)).or_default();
        let conflict_target = on_conflict
            .map(|c| c.target_for(model).to_vec())
            .unwrap_or_else(|| model.primary_key.clone());

        if let Some(existing) = table.iter_mut().find(|r| conflicts(r, &row, &conflict_target)) {
            return match on_conflict.map(|c| &c.action) {
                None => Err(AppError::Conflict(format!(
                    "duplicate key ({}) in {}",
                    conflict_target.join(", "),
                    model.name
                ))),
                Some(ConflictAction::DoNothing) => Ok(None),
                Some(ConflictAction::DoUpdate(fields)) => {
                    let fields: Vec<&str> = if fields.is_empty() {
                        record
                            .iter()
                            .map(|(f, _)| f)
                            .filter(|f| !conflict_target.iter().any(|t| t == f))
                            .collect()
                    } else {
                        fields.iter().map(String::as_str).collect()
                    };
                    for f in fields {
                        if let Some(v) = row.get(f) {
                            existing.insert(f.to_string(), v.clone());
                        }
                    }
                    Ok(Some(present(model, existing)))
                }
            };
        }

        let inserted = present(model, &row);
        table.push(row);
        Ok(Some(inserted))
    }

    async fn update(&self, query: &Query, record: &ResolvedRecord) -> Result<Vec<Value>, AppError> {
        query.ensure_known_fields()?;
        let mut tables = self.write()?;
        let Some(table) = tables.get_mut(&table_key(&query.model)) else {
            return Ok(Vec::new());
        };
        let mut updated = Vec::new();
        for row in table.iter_mut().filter(|r| matches(query, r)) {
            Self::apply(&query.model, row, record);
            updated.push(present(&query.model, row));
        }
        Ok(updated)
    }

    async fn delete(&self, query: &Query) -> Result<u64, AppError> {
        query.ensure_known_fields()?;
        let mut tables = self.write()?;
        let Some(table) = tables.get_mut(&table_key(&query.model)) else {
            return Ok(0);
        };
        let before = table.len();
        table.retain(|r| !matches(query, r));
        Ok((before - table.len()) as u64)
    }
}
