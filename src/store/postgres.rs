//! Query execution against PostgreSQL.

use crate::attributes::ResolvedRecord;
use crate::config::ModelSchema;
use crate::error::AppError;
use crate::query::Query;
use crate::sql::{self, QueryBuf};
use crate::store::{OnConflict, QueryEngine};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

#[derive(Clone)]
pub struct PgEngine {
    pool: PgPool,
}

impl PgEngine {
    pub fn new(pool: PgPool) -> Self {
        PgEngine { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn query_many(&self, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(map_db_error)?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.execute(&self.pool).await.map_err(map_db_error)?.rows_affected())
    }
}

#[async_trait]
impl QueryEngine for PgEngine {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, AppError> {
        self.query_many(&sql::select(query)?).await
    }

    async fn insert(
        &self,
        model: &ModelSchema,
        record: &ResolvedRecord,
        on_conflict: Option<&OnConflict>,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::insert(model, record, on_conflict)?;
        Ok(self.query_many(&q).await?.into_iter().next())
    }

    async fn update(&self, query: &Query, record: &ResolvedRecord) -> Result<Vec<Value>, AppError> {
        self.query_many(&sql::update(query, record)?).await
    }

    async fn delete(&self, query: &Query) -> Result<u64, AppError> {
        self.execute(&sql::delete(query)?).await
    }
}

/// Unique violations (SQLSTATE 23505) surface as `Conflict`, like the in-memory engine's
/// duplicate-key check. Everything else stays a database error.
fn map_db_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("23505") {
            let message = match db.constraint() {
                Some(constraint) => format!("duplicate key violates {}", constraint),
                None => db.message().to_string(),
            };
            return AppError::Conflict(message);
        }
    }
    AppError::Db(err)
}

fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

/// Decode one cell by trying the column types the registry can declare.
fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.3f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
