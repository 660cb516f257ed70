//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from a [`Query`] and a resolved record.

use crate::attributes::{FieldValue, ResolvedRecord};
use crate::config::{FieldInfo, ModelSchema};
use crate::error::{AppError, ConfigError};
use crate::query::{Direction, Operator, Predicate, Query};
use crate::sql::PgBindValue;
use crate::store::{ConflictAction, OnConflict};

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Table name, schema-qualified when the model names a schema.
fn qualified_table(model: &ModelSchema) -> String {
    match &model.schema_name {
        Some(schema) => format!("{}.{}", quoted(schema), quoted(&model.table_name)),
        None => quoted(&model.table_name),
    }
}

fn field_info<'a>(model: &'a ModelSchema, name: &str) -> Result<&'a FieldInfo, AppError> {
    model.field(name).ok_or_else(|| {
        ConfigError::MissingReference {
            kind: "field",
            id: format!("{}.{}", model.name, name),
        }
        .into()
    })
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        Self::default()
    }

    fn push_param(&mut self, v: PgBindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }

    /// Bind a value for `field` and return its cast placeholder.
    fn bind(&mut self, field: &FieldInfo, value: &serde_json::Value) -> String {
        let n = self.push_param(PgBindValue::from_json(value));
        format!("${}::{}", n, field.field_type.pg_type())
    }

    fn bind_list(&mut self, field: &FieldInfo, value: &serde_json::Value) -> String {
        let n = self.push_param(PgBindValue::list(value));
        format!("${}::{}[]", n, field.field_type.pg_type())
    }

    fn condition(&mut self, model: &ModelSchema, p: &Predicate) -> Result<String, AppError> {
        let field = field_info(model, &p.field)?;
        let col = quoted(&p.field);
        Ok(match p.op {
            Operator::IsNull | Operator::IsNotNull => format!("{} {}", col, p.op.as_sql()),
            Operator::In | Operator::NotIn => {
                if p.value.as_array().is_some_and(|items| items.is_empty()) {
                    let constant = if p.op == Operator::In { "FALSE" } else { "TRUE" };
                    return Ok(constant.to_string());
                }
                let ph = self.bind_list(field, &p.value);
                if p.op == Operator::In {
                    format!("{} = ANY({})", col, ph)
                } else {
                    format!("{} <> ALL({})", col, ph)
                }
            }
            Operator::Like | Operator::ILike => {
                let n = self.push_param(PgBindValue::from_json(&p.value));
                format!("{}::text {} ${}::text", col, p.op.as_sql(), n)
            }
            _ => {
                let ph = self.bind(field, &p.value);
                format!("{} {} {}", col, p.op.as_sql(), ph)
            }
        })
    }

    fn where_clause(&mut self, query: &Query) -> Result<String, AppError> {
        let parts = query
            .filters
            .iter()
            .map(|p| self.condition(&query.model, p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(if parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", parts.join(" AND "))
        })
    }
}

/// SELECT list: each column as-is, except numeric as col::text so sqlx returns String.
fn select_column_list(model: &ModelSchema) -> String {
    model
        .fields
        .iter()
        .map(|f| {
            let q = quoted(&f.name);
            if f.field_type.select_as_text() {
                format!("{}::text AS {}", q, q)
            } else {
                q
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// ORDER BY the query's ordering, or the primary key when none was set.
fn order_clause(query: &Query) -> String {
    let parts: Vec<String> = if query.order_by.is_empty() {
        query.model.primary_key.iter().map(|c| quoted(c)).collect()
    } else {
        query
            .order_by
            .iter()
            .map(|o| {
                let dir = match o.direction {
                    Direction::Asc => "ASC",
                    Direction::Desc => "DESC",
                };
                format!("{} {}", quoted(&o.field), dir)
            })
            .collect()
    };
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {}", parts.join(", "))
    }
}

/// SELECT with the query's filters, ordering, LIMIT and OFFSET.
pub fn select(query: &Query) -> Result<QueryBuf, AppError> {
    query.ensure_known_fields()?;
    let mut q = QueryBuf::new();
    let where_clause = q.where_clause(query)?;
    let limit_clause = query.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_clause = query.offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}{}",
        select_column_list(&query.model),
        qualified_table(&query.model),
        where_clause,
        order_clause(query),
        limit_clause,
        offset_clause
    );
    Ok(q)
}

/// INSERT of exactly the resolved fields. `FieldValue::Default` renders the DEFAULT keyword;
/// an empty record inserts `DEFAULT VALUES`.
pub fn insert(
    model: &ModelSchema,
    record: &ResolvedRecord,
    on_conflict: Option<&OnConflict>,
) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let table = qualified_table(model);
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for (name, value) in record.iter() {
        let field = field_info(model, name)?;
        cols.push(quoted(name));
        placeholders.push(match value {
            FieldValue::Set(v) => q.bind(field, v),
            FieldValue::Default => "DEFAULT".to_string(),
        });
    }

    let values = if cols.is_empty() {
        " DEFAULT VALUES".to_string()
    } else {
        format!(" ({}) VALUES ({})", cols.join(", "), placeholders.join(", "))
    };
    let conflict = match on_conflict {
        Some(c) => conflict_clause(model, record, c)?,
        None => String::new(),
    };
    q.sql = format!(
        "INSERT INTO {}{}{} RETURNING {}",
        table,
        values,
        conflict,
        select_column_list(model)
    );
    Ok(q)
}

fn conflict_clause(model: &ModelSchema, record: &ResolvedRecord, c: &OnConflict) -> Result<String, AppError> {
    let target = c.target_for(model);
    for col in target {
        field_info(model, col)?;
    }
    let target_sql = if target.is_empty() {
        String::new()
    } else {
        format!(" ({})", target.iter().map(|t| quoted(t)).collect::<Vec<_>>().join(", "))
    };
    let fields: Vec<&str> = match &c.action {
        ConflictAction::DoNothing => Vec::new(),
        ConflictAction::DoUpdate(fields) if fields.is_empty() => record
            .iter()
            .map(|(f, _)| f)
            .filter(|f| !target.iter().any(|t| t == f))
            .collect(),
        ConflictAction::DoUpdate(fields) => {
            for f in fields {
                field_info(model, f)?;
            }
            fields.iter().map(String::as_str).collect()
        }
    };
    if fields.is_empty() {
        return Ok(format!(" ON CONFLICT{} DO NOTHING", target_sql));
    }
    let sets: Vec<String> = fields
        .iter()
        .map(|f| format!("{} = EXCLUDED.{}", quoted(f), quoted(f)))
        .collect();
    Ok(format!(" ON CONFLICT{} DO UPDATE SET {}", target_sql, sets.join(", ")))
}

/// UPDATE every row matching the query filters. With nothing to set this falls back to a
/// SELECT of the same rows so callers still see what matched.
pub fn update(query: &Query, record: &ResolvedRecord) -> Result<QueryBuf, AppError> {
    if record.is_empty() {
        return select(query);
    }
    query.ensure_known_fields()?;
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (name, value) in record.iter() {
        let field = field_info(&query.model, name)?;
        let rhs = match value {
            FieldValue::Set(v) => q.bind(field, v),
            FieldValue::Default => "DEFAULT".to_string(),
        };
        sets.push(format!("{} = {}", quoted(name), rhs));
    }
    let where_clause = q.where_clause(query)?;
    q.sql = format!(
        "UPDATE {} SET {}{} RETURNING {}",
        qualified_table(&query.model),
        sets.join(", "),
        where_clause,
        select_column_list(&query.model)
    );
    Ok(q)
}

/// DELETE every row matching the query filters.
pub fn delete(query: &Query) -> Result<QueryBuf, AppError> {
    query.ensure_known_fields()?;
    let mut q = QueryBuf::new();
    let where_clause = q.where_clause(query)?;
    q.sql = format!("DELETE FROM {}{}", qualified_table(&query.model), where_clause);
    Ok(q)
}
