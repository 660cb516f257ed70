//! Resolved model schemas: config validated and flattened for runtime use.

use crate::config::ValidationRule;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

/// Declared field type. Drives payload validation, route-parameter coercion and SQL casts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    BigInt,
    Float,
    Numeric,
    Boolean,
    Uuid,
    Timestamp,
    Timestamptz,
    Date,
    Json,
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Ok(match lower.as_str() {
            "text" | "string" | "varchar" | "char" | "character varying" | "citext" => FieldType::Text,
            "int" | "integer" | "int4" | "smallint" | "int2" | "serial" => FieldType::Integer,
            "bigint" | "int8" | "bigserial" => FieldType::BigInt,
            "float" | "real" | "double" | "double precision" | "float4" | "float8" => FieldType::Float,
            "numeric" | "decimal" => FieldType::Numeric,
            "bool" | "boolean" => FieldType::Boolean,
            "uuid" => FieldType::Uuid,
            "timestamp" | "timestamp without time zone" => FieldType::Timestamp,
            "timestamptz" | "timestamp with time zone" => FieldType::Timestamptz,
            "date" => FieldType::Date,
            "json" | "jsonb" => FieldType::Json,
            _ => return Err(s.to_string()),
        })
    }
}

impl FieldType {
    /// PostgreSQL type every bound placeholder for this field is cast to (`$n::type`).
    pub fn pg_type(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::BigInt => "bigint",
            FieldType::Float => "double precision",
            FieldType::Numeric => "numeric",
            FieldType::Boolean => "boolean",
            FieldType::Uuid => "uuid",
            FieldType::Timestamp => "timestamp",
            FieldType::Timestamptz => "timestamptz",
            FieldType::Date => "date",
            FieldType::Json => "jsonb",
        }
    }

    /// Selected as text so arbitrary-precision values survive the round trip.
    pub fn select_as_text(&self) -> bool {
        matches!(self, FieldType::Numeric)
    }

    /// Convert a raw path segment to a JSON value of this type.
    ///
    /// Input the column could never hold is an error carrying the same message payload
    /// validation uses, so callers never hand the store a value its cast would reject.
    pub fn coerce_param(&self, raw: &str) -> Result<Value, String> {
        let value = match self {
            FieldType::Integer | FieldType::BigInt => raw.parse::<i64>().ok().map(Value::from),
            FieldType::Float => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            FieldType::Boolean => {
                if raw.eq_ignore_ascii_case("true") || raw == "1" {
                    Some(Value::Bool(true))
                } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
                    Some(Value::Bool(false))
                } else {
                    None
                }
            }
            FieldType::Uuid => uuid::Uuid::parse_str(raw).ok().map(|u| Value::String(u.to_string())),
            _ => Some(Value::String(raw.to_string())),
        };
        let value = value.ok_or_else(|| crate::service::invalid_type_message(self))?;
        crate::service::check_type(self, &value)?;
        Ok(value)
    }
}

#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    /// Column default; also marks the field as optional on create.
    pub default: Option<Value>,
    /// Upper bound from a parameterized type such as `varchar(255)`.
    pub max_length: Option<u32>,
    pub rule: Option<ValidationRule>,
}

impl FieldInfo {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// A registered model. Immutable once built by [`crate::config::resolve`].
#[derive(Clone, Debug)]
pub struct ModelSchema {
    pub name: String,
    pub singular: String,
    pub schema_name: Option<String>,
    pub table_name: String,
    pub primary_key: Vec<String>,
    pub fields: Vec<FieldInfo>,
}

impl ModelSchema {
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    pub models: Vec<Arc<ModelSchema>>,
    pub model_by_name: HashMap<String, Arc<ModelSchema>>,
}

impl ModelRegistry {
    pub fn get(&self, name: &str) -> Option<Arc<ModelSchema>> {
        self.model_by_name.get(name).cloned()
    }

    /// Like [`ModelRegistry::get`] but reports unknown names as a config error.
    pub fn require(&self, name: &str) -> Result<Arc<ModelSchema>, crate::error::ConfigError> {
        self.get(name).ok_or_else(|| crate::error::ConfigError::MissingReference {
            kind: "model",
            id: name.to_string(),
        })
    }
}
