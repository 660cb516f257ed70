//! Resolve an attribute spec into a concrete record for one request.

use crate::attributes::{AttributeSource, AttributeSpec, FieldValue, ResolvedRecord, TimestampKind};
use crate::config::ModelSchema;
use crate::context::RequestContext;
use crate::error::{AppError, ConfigError};
use crate::service::{SchemaValidator, ValidationMode};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

/// Caller-supplied side data for `Argument` sources.
pub type Arguments = Map<String, Value>;

/// Booleans are stored as "1"/"0".
pub fn encode_value(value: Value) -> Value {
    match value {
        Value::Bool(true) => Value::String("1".into()),
        Value::Bool(false) => Value::String("0".into()),
        other => other,
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Resolve every declared field, in declaration order.
///
/// Payload-sourced fields are validated together first, against the schema restricted to
/// exactly those fields, so nothing outside the spec is ever taken from the payload.
/// Custom resolvers run one after another in field order.
pub async fn resolve(
    ctx: &RequestContext,
    model: &ModelSchema,
    payload: Option<&Value>,
    spec: &AttributeSpec,
    args: Option<&Arguments>,
    mode: ValidationMode,
) -> Result<ResolvedRecord, AppError> {
    for (name, _) in spec.iter() {
        if !model.has_field(name) {
            return Err(ConfigError::MissingReference {
                kind: "field",
                id: format!("{}.{}", model.name, name),
            }
            .into());
        }
    }

    let payload_fields = spec.payload_fields();
    let validated = if payload_fields.is_empty() {
        Map::new()
    } else {
        SchemaValidator::validate_subset(model, payload, &payload_fields, mode)?
    };

    let mut record = ResolvedRecord::new();
    for (name, source) in spec.iter() {
        let value = match source {
            AttributeSource::Null => Some(FieldValue::Set(Value::Null)),
            AttributeSource::Default => Some(FieldValue::Default),
            AttributeSource::GeneratedId => Some(FieldValue::Set(Value::String(uuid::Uuid::new_v4().to_string()))),
            // Updates keep the creation time already stored.
            AttributeSource::Timestamp(TimestampKind::Insert) if mode == ValidationMode::Partial => None,
            AttributeSource::Timestamp(_) => Some(FieldValue::Set(Value::String(now()))),
            AttributeSource::Context => ctx.get(name).map(FieldValue::Set),
            AttributeSource::Argument => {
                let bag = args.ok_or_else(|| {
                    AppError::MissingArgument(format!("{}.{} requires an argument bag", model.name, name))
                })?;
                bag.get(name).cloned().map(FieldValue::Set)
            }
            AttributeSource::Payload => validated.get(name).cloned().map(FieldValue::Set),
            AttributeSource::RouteParam => match (ctx.route_param(name), model.field(name)) {
                (None, _) => None,
                (Some(raw), Some(f)) => Some(FieldValue::Set(
                    f.field_type.coerce_param(raw).map_err(|message| AppError::invalid(name, message))?,
                )),
                (Some(raw), None) => Some(FieldValue::Set(Value::String(raw.to_string()))),
            },
            AttributeSource::Custom(f) => Some(FieldValue::Set(f(ctx.clone()).await?)),
        };
        match value {
            Some(FieldValue::Set(v)) => record.insert(name, FieldValue::Set(encode_value(v))),
            Some(FieldValue::Default) => record.insert(name, FieldValue::Default),
            None => tracing::trace!(model = %model.name, field = %name, "attribute left unset"),
        }
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::TimestampKind;
    use crate::config::{load_from_str, resolve as resolve_config};
    use crate::store::MemoryEngine;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn users() -> Arc<ModelSchema> {
        let json = r#"[{
            "name": "users",
            "primary_key": "user_id",
            "fields": [
                { "name": "user_id", "type": "uuid", "nullable": false },
                { "name": "org_id", "type": "integer" },
                { "name": "name", "type": "text", "nullable": false },
                { "name": "admin", "type": "boolean" },
                { "name": "owner_id", "type": "text" },
                { "name": "invited_by", "type": "text" },
                { "name": "nickname", "type": "text" },
                { "name": "status", "type": "text", "default": "active" },
                { "name": "created_at", "type": "timestamptz" },
                { "name": "updated_at", "type": "timestamptz" }
            ]
        }]"#;
        resolve_config(&load_from_str(json).unwrap()).unwrap().get("users").unwrap()
    }

    fn ctx_with(body: Value) -> RequestContext {
        RequestContext::builder(Arc::new(MemoryEngine::new()))
            .param("org_id", "7")
            .body(body)
            .local("owner_id", json!("owner-1"))
            .build()
    }

    #[tokio::test]
    async fn payload_fields_outside_the_spec_are_dropped() {
        let ctx = ctx_with(json!({ "name": "Ann", "extra": "ignored", "admin": true }));
        let spec = AttributeSpec::new()
            .field("user_id", AttributeSource::GeneratedId)
            .field("name", AttributeSource::Payload);
        let record = resolve(&ctx, &users(), ctx.body(), &spec, None, ValidationMode::Full).await.unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.value("name"), Some(&json!("Ann")));
        let id = record.value("user_id").and_then(Value::as_str).unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
        assert!(!record.contains("admin"));
    }

    #[tokio::test]
    async fn each_source_resolves() {
        let ctx = ctx_with(json!({ "admin": false }));
        let spec = AttributeSpec::new()
            .field("org_id", AttributeSource::RouteParam)
            .field("owner_id", AttributeSource::Context)
            .field("invited_by", AttributeSource::Argument)
            .field("admin", AttributeSource::Payload)
            .field("nickname", AttributeSource::Null)
            .field("status", AttributeSource::Default)
            .field("updated_at", AttributeSource::Timestamp(TimestampKind::Update));
        let mut args = Arguments::new();
        args.insert("invited_by".into(), json!("u9"));
        let record = resolve(&ctx, &users(), ctx.body(), &spec, Some(&args), ValidationMode::Partial)
            .await
            .unwrap();
        assert_eq!(record.value("org_id"), Some(&json!(7)));
        assert_eq!(record.value("owner_id"), Some(&json!("owner-1")));
        assert_eq!(record.value("invited_by"), Some(&json!("u9")));
        assert_eq!(record.value("admin"), Some(&json!("0")));
        assert_eq!(record.value("nickname"), Some(&Value::Null));
        assert_eq!(record.get("status"), Some(&FieldValue::Default));
        let ts = record.value("updated_at").and_then(Value::as_str).unwrap();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[tokio::test]
    async fn updates_leave_the_creation_timestamp_alone() {
        let ctx = RequestContext::new(Arc::new(MemoryEngine::new()));
        let spec = AttributeSpec::new()
            .field("created_at", AttributeSource::Timestamp(TimestampKind::Insert))
            .field("updated_at", AttributeSource::Timestamp(TimestampKind::Update));

        let created = resolve(&ctx, &users(), None, &spec, None, ValidationMode::Full).await.unwrap();
        assert!(created.contains("created_at"));
        assert!(created.contains("updated_at"));

        let updated = resolve(&ctx, &users(), None, &spec, None, ValidationMode::Partial).await.unwrap();
        assert!(!updated.contains("created_at"));
        assert!(updated.contains("updated_at"));
    }

    #[tokio::test]
    async fn booleans_from_any_source_are_encoded() {
        let ctx = ctx_with(json!({ "admin": true }));
        let spec = AttributeSpec::new()
            .field("admin", AttributeSource::Payload)
            .field("nickname", AttributeSource::computed(|_| Ok(json!(false))));
        let record = resolve(&ctx, &users(), ctx.body(), &spec, None, ValidationMode::Partial).await.unwrap();
        assert_eq!(record.value("admin"), Some(&json!("1")));
        assert_eq!(record.value("nickname"), Some(&json!("0")));
    }

    #[tokio::test]
    async fn missing_context_value_leaves_field_unset() {
        let ctx = RequestContext::new(Arc::new(MemoryEngine::new()));
        let spec = AttributeSpec::new().field("owner_id", AttributeSource::Context);
        let record = resolve(&ctx, &users(), None, &spec, None, ValidationMode::Full).await.unwrap();
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn argument_without_bag_fails_fast() {
        let ctx = RequestContext::new(Arc::new(MemoryEngine::new()));
        let spec = AttributeSpec::new().field("invited_by", AttributeSource::Argument);
        let err = resolve(&ctx, &users(), None, &spec, None, ValidationMode::Full).await.unwrap_err();
        assert!(matches!(err, AppError::MissingArgument(_)));
    }

    #[tokio::test]
    async fn custom_resolvers_run_in_field_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let first = calls.clone();
        let second = calls.clone();
        let spec = AttributeSpec::new()
            .field(
                "nickname",
                AttributeSource::custom(move |_ctx| {
                    let calls = first.clone();
                    async move {
                        tokio::task::yield_now().await;
                        calls.lock().unwrap().push("nickname");
                        Ok(json!("nick"))
                    }
                }),
            )
            .field(
                "owner_id",
                AttributeSource::custom(move |ctx| {
                    let calls = second.clone();
                    async move {
                        calls.lock().unwrap().push("owner_id");
                        Ok(ctx.get("owner_id").unwrap_or(Value::Null))
                    }
                }),
            );
        let ctx = ctx_with(json!({}));
        let record = resolve(&ctx, &users(), None, &spec, None, ValidationMode::Full).await.unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["nickname", "owner_id"]);
        assert_eq!(record.value("owner_id"), Some(&json!("owner-1")));
    }

    #[tokio::test]
    async fn validation_failure_stops_resolution() {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let spec = AttributeSpec::new()
            .field(
                "nickname",
                AttributeSource::computed(move |_| {
                    *counter.lock().unwrap() += 1;
                    Ok(json!("n"))
                }),
            )
            .field("name", AttributeSource::Payload);
        let ctx = ctx_with(json!({ "name": 5 }));
        let err = resolve(&ctx, &users(), ctx.body(), &spec, None, ValidationMode::Full).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn undeclared_field_is_a_config_error() {
        let ctx = RequestContext::new(Arc::new(MemoryEngine::new()));
        let spec = AttributeSpec::new().field("password", AttributeSource::Payload);
        let err = resolve(&ctx, &users(), None, &spec, None, ValidationMode::Full).await.unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::MissingReference { .. })));
    }
}
