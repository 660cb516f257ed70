//! Convert serde_json::Value to values sqlx can bind.
//!
//! Every value travels as text (or a text array) and the statement casts the
//! placeholder to the column type, so one bind type covers every column.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Text(String),
    /// Element list for `= ANY` / `<> ALL`. Nulls are dropped; they never match.
    TextArray(Vec<String>),
}

fn to_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(v.to_string()),
    }
}

impl PgBindValue {
    pub fn from_json(v: &Value) -> Self {
        match to_text(v) {
            Some(s) => PgBindValue::Text(s),
            None => PgBindValue::Null,
        }
    }

    /// A JSON array becomes its elements; any other value a one-element list.
    pub fn list(v: &Value) -> Self {
        let items = match v {
            Value::Array(items) => items.iter().filter_map(to_text).collect(),
            other => to_text(other).into_iter().collect(),
        };
        PgBindValue::TextArray(items)
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null => <Option<String> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            PgBindValue::Text(s) => <&str as Encode<Postgres>>::encode_by_ref(&s.as_str(), buf)?,
            PgBindValue::TextArray(items) => <Vec<String> as Encode<Postgres>>::encode_by_ref(items, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        match self {
            PgBindValue::TextArray(_) => Some(PgTypeInfo::with_name("_TEXT")),
            _ => Some(PgTypeInfo::with_name("TEXT")),
        }
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}
