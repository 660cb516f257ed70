//! Payload validation against a model schema restricted to a subset of fields.

use crate::config::{FieldInfo, FieldType, ModelSchema, ValidationRule};
use crate::error::{AppError, FieldError};
use regex::Regex;
use serde_json::{Map, Value};

/// Create requires every non-nullable field without a default; update accepts any subset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationMode {
    Full,
    Partial,
}

pub struct SchemaValidator;

impl SchemaValidator {
    /// Validate `payload` against the named `fields` of `model` and return only those fields.
    /// Keys outside `fields` are dropped, whatever the payload contains.
    pub fn validate_subset(
        model: &ModelSchema,
        payload: Option<&Value>,
        fields: &[&str],
        mode: ValidationMode,
    ) -> Result<Map<String, Value>, AppError> {
        let empty = Map::new();
        let body = match payload {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(m)) => m,
            Some(_) => return Err(AppError::BadRequest("body must be a JSON object".into())),
        };

        let mut errors = Vec::new();
        let mut out = Map::new();
        for name in fields {
            let Some(field) = model.field(name) else {
                errors.push(FieldError::new(*name, "is not a field of this model"));
                continue;
            };
            match body.get(*name) {
                Some(v) => {
                    let before = errors.len();
                    validate_field(field, v, &mut errors);
                    if errors.len() == before {
                        out.insert(name.to_string(), v.clone());
                    }
                }
                None => {
                    if mode == ValidationMode::Full && is_required(field) {
                        errors.push(FieldError::new(*name, "is required"));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(out)
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

fn is_required(field: &FieldInfo) -> bool {
    let rule_required = field.rule.as_ref().and_then(|r| r.required) == Some(true);
    rule_required || (!field.nullable && !field.has_default())
}

fn validate_field(field: &FieldInfo, v: &Value, errors: &mut Vec<FieldError>) {
    let col = field.name.as_str();
    if v.is_null() {
        let rule_required = field.rule.as_ref().and_then(|r| r.required) == Some(true);
        if !field.nullable || rule_required {
            errors.push(FieldError::new(col, "must not be null"));
        }
        return;
    }
    if let Err(message) = check_type(&field.field_type, v) {
        errors.push(FieldError::new(col, message));
        return;
    }
    if let (Some(max), Some(s)) = (field.max_length, v.as_str()) {
        if s.chars().count() > max as usize {
            errors.push(FieldError::new(col, format!("must be at most {} characters", max)));
        }
    }
    if let Some(rule) = &field.rule {
        check_rule(col, v, rule, errors);
    }
}

pub(crate) fn check_type(ty: &FieldType, v: &Value) -> Result<(), String> {
    let ok = match ty {
        FieldType::Text => v.is_string(),
        FieldType::Integer | FieldType::BigInt => v.is_i64() || v.is_u64(),
        FieldType::Float => v.is_number(),
        FieldType::Numeric => v.is_number() || v.as_str().map(|s| s.parse::<f64>().is_ok()).unwrap_or(false),
        FieldType::Boolean => v.is_boolean(),
        FieldType::Uuid => v.as_str().map(|s| uuid::Uuid::parse_str(s).is_ok()).unwrap_or(false),
        FieldType::Timestamp | FieldType::Timestamptz => v.as_str().map(is_timestamp).unwrap_or(false),
        FieldType::Date => v
            .as_str()
            .map(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
            .unwrap_or(false),
        FieldType::Json => true,
    };
    if ok {
        Ok(())
    } else {
        Err(invalid_type_message(ty))
    }
}

pub(crate) fn invalid_type_message(ty: &FieldType) -> String {
    format!("must be a valid {}", type_label(ty))
}

fn is_timestamp(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").is_ok()
}

fn type_label(ty: &FieldType) -> &'static str {
    match ty {
        FieldType::Text => "string",
        FieldType::Integer | FieldType::BigInt => "integer",
        FieldType::Float | FieldType::Numeric => "number",
        FieldType::Boolean => "boolean",
        FieldType::Uuid => "UUID",
        FieldType::Timestamp | FieldType::Timestamptz => "timestamp",
        FieldType::Date => "date",
        FieldType::Json => "JSON value",
    }
}

fn check_rule(col: &str, v: &Value, rule: &ValidationRule, errors: &mut Vec<FieldError>) {
    if let Some(format) = &rule.format {
        if let Err(message) = check_format(v, format) {
            errors.push(FieldError::new(col, message));
        }
    }
    if let (Some(max), Some(s)) = (rule.max_length, v.as_str()) {
        if s.chars().count() > max as usize {
            errors.push(FieldError::new(col, format!("must be at most {} characters", max)));
        }
    }
    if let (Some(min), Some(s)) = (rule.min_length, v.as_str()) {
        if s.chars().count() < min as usize {
            errors.push(FieldError::new(col, format!("must be at least {} characters", min)));
        }
    }
    if let Some(pattern) = &rule.pattern {
        match Regex::new(pattern) {
            Ok(re) => {
                if let Some(s) = v.as_str() {
                    if !re.is_match(s) {
                        errors.push(FieldError::new(col, "does not match required pattern"));
                    }
                }
            }
            Err(_) => errors.push(FieldError::new(col, "has an invalid pattern rule")),
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            errors.push(FieldError::new(
                col,
                format!("must be one of: {:?}", allowed.iter().take(5).collect::<Vec<_>>()),
            ));
        }
    }
    if let (Some(min), Some(n)) = (rule.minimum, v.as_f64()) {
        if n < min {
            errors.push(FieldError::new(col, format!("must be at least {}", min)));
        }
    }
    if let (Some(max), Some(n)) = (rule.maximum, v.as_f64()) {
        if n > max {
            errors.push(FieldError::new(col, format!("must be at most {}", max)));
        }
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn check_format(v: &Value, format: &str) -> Result<(), &'static str> {
    let Some(s) = v.as_str() else { return Ok(()) };
    match format.to_lowercase().as_str() {
        "email" if !s.contains('@') || s.len() < 3 => Err("must be a valid email"),
        "uuid" if uuid::Uuid::parse_str(s).is_err() => Err("must be a valid UUID"),
        _ => Ok(()),
    }
}
