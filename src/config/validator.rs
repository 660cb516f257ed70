//! Config validation: names, primary keys, field types and singular naming.

use crate::config::{FieldType, FullConfig, ModelConfig};
use crate::error::ConfigError;
use std::collections::HashSet;

/// Singular cache name for a model: explicit `singular`, else the name with one trailing "s" stripped.
/// Names that do not end in "s" have no safe default and must be configured.
pub fn singular_name(model: &ModelConfig) -> Result<String, ConfigError> {
    if let Some(s) = model.singular.as_deref().filter(|s| !s.is_empty()) {
        return Ok(s.to_string());
    }
    match model.name.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => Ok(stem.to_string()),
        _ => Err(ConfigError::MissingSingular(model.name.clone())),
    }
}

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    let mut model_names = HashSet::new();
    for model in &config.models {
        if model.name.is_empty() {
            return Err(ConfigError::Validation("model name must not be empty".into()));
        }
        if !model_names.insert(model.name.as_str()) {
            return Err(ConfigError::DuplicateModel(model.name.clone()));
        }
        if model.fields.is_empty() {
            return Err(ConfigError::Validation(format!("model {} has no fields", model.name)));
        }

        let mut field_names = HashSet::new();
        for f in &model.fields {
            if !field_names.insert(f.name.as_str()) {
                return Err(ConfigError::DuplicateField {
                    model: model.name.clone(),
                    field: f.name.clone(),
                });
            }
            if f.type_.name().parse::<FieldType>().is_err() {
                return Err(ConfigError::UnknownFieldType {
                    model: model.name.clone(),
                    field: f.name.clone(),
                    type_name: f.type_.name().to_string(),
                });
            }
        }

        let pk = model.primary_key.columns();
        if pk.is_empty() {
            return Err(ConfigError::Validation(format!("model {} has an empty primary key", model.name)));
        }
        for col in &pk {
            if !field_names.contains(col.as_str()) {
                return Err(ConfigError::InvalidPrimaryKey {
                    model: model.name.clone(),
                    field: col.clone(),
                });
            }
        }

        singular_name(model)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_from_str;

    fn model_json(name: &str, singular: Option<&str>) -> String {
        let singular = singular
            .map(|s| format!(r#""singular": "{}","#, s))
            .unwrap_or_default();
        format!(
            r#"[{{"name": "{}", {} "primary_key": "id", "fields": [{{"name": "id", "type": "uuid", "nullable": false}}]}}]"#,
            name, singular
        )
    }

    #[test]
    fn strips_trailing_s_by_default() {
        let config = load_from_str(&model_json("things", None)).unwrap();
        assert_eq!(singular_name(&config.models[0]).unwrap(), "thing");
    }

    #[test]
    fn irregular_plural_requires_explicit_singular() {
        let config = load_from_str(&model_json("people", None)).unwrap();
        assert!(matches!(validate(&config), Err(ConfigError::MissingSingular(name)) if name == "people"));

        let config = load_from_str(&model_json("people", Some("person"))).unwrap();
        assert!(validate(&config).is_ok());
        assert_eq!(singular_name(&config.models[0]).unwrap(), "person");
    }

    #[test]
    fn primary_key_must_be_a_declared_field() {
        let json = r#"[{"name": "users", "primary_key": "user_id", "fields": [{"name": "id", "type": "uuid"}]}]"#;
        let config = load_from_str(json).unwrap();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidPrimaryKey { .. })));
    }

    #[test]
    fn rejects_unknown_field_types() {
        let json = r#"[{"name": "users", "primary_key": "id", "fields": [{"name": "id", "type": "geometry"}]}]"#;
        let config = load_from_str(json).unwrap();
        assert!(matches!(validate(&config), Err(ConfigError::UnknownFieldType { .. })));
    }
}
