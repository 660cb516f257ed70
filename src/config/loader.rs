//! Load model config from JSON (string or directory) and resolve it into a registry.

use crate::config::resolved::{FieldInfo, FieldType, ModelRegistry, ModelSchema};
use crate::config::types::*;
use crate::config::{singular_name, validate};
use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// File read by [`load_from_dir`].
pub const MODELS_FILE: &str = "models.json";

/// Build the model registry from full config. Validates first.
pub fn resolve(config: &FullConfig) -> Result<ModelRegistry, ConfigError> {
    validate(config)?;

    let mut models = Vec::with_capacity(config.models.len());
    let mut model_by_name = HashMap::new();

    for model in &config.models {
        let fields = model
            .fields
            .iter()
            .map(|f| resolve_field(model, f))
            .collect::<Result<Vec<_>, _>>()?;
        let schema = Arc::new(ModelSchema {
            name: model.name.clone(),
            singular: singular_name(model)?,
            schema_name: model.schema.clone(),
            table_name: model.table.clone().unwrap_or_else(|| model.name.clone()),
            primary_key: model.primary_key.columns(),
            fields,
        });
        model_by_name.insert(model.name.clone(), schema.clone());
        models.push(schema);
    }

    tracing::debug!(count = models.len(), "resolved models");
    Ok(ModelRegistry {
        models,
        model_by_name,
    })
}

fn resolve_field(model: &ModelConfig, f: &FieldConfig) -> Result<FieldInfo, ConfigError> {
    let field_type: FieldType = f.type_.name().parse().map_err(|type_name| ConfigError::UnknownFieldType {
        model: model.name.clone(),
        field: f.name.clone(),
        type_name,
    })?;
    let max_length = match field_type {
        FieldType::Text => f.type_.params().first().copied(),
        _ => None,
    };
    Ok(FieldInfo {
        name: f.name.clone(),
        field_type,
        nullable: f.nullable,
        default: f.default.clone(),
        max_length,
        rule: f.validation.clone(),
    })
}

/// Parse model config from JSON: either `{ "models": [...] }` or a bare array of models.
pub fn load_from_str(json: &str) -> Result<FullConfig, ConfigError> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
    let config = match value {
        serde_json::Value::Array(_) => FullConfig {
            models: serde_json::from_value(value).map_err(|e| ConfigError::Load(e.to_string()))?,
        },
        serde_json::Value::Object(_) => {
            serde_json::from_value(value).map_err(|e| ConfigError::Load(e.to_string()))?
        }
        _ => return Err(ConfigError::Load("models config must be an array or an object".into())),
    };
    Ok(config)
}

/// Read `models.json` from a directory.
pub async fn load_from_dir(dir: impl AsRef<Path>) -> Result<FullConfig, ConfigError> {
    let path = dir.as_ref().join(MODELS_FILE);
    tracing::debug!(path = %path.display(), "loading models");
    let json = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    load_from_str(&json)
}
