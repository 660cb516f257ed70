//! Raw config types matching the models JSON file.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKeyConfig {
    Single(String),
    Composite(Vec<String>),
}

impl PrimaryKeyConfig {
    pub fn columns(&self) -> Vec<String> {
        match self {
            PrimaryKeyConfig::Single(s) => vec![s.clone()],
            PrimaryKeyConfig::Composite(v) => v.clone(),
        }
    }
}

/// Field type as written in config: `"text"` or `{ "name": "varchar", "params": [255] }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldTypeConfig {
    Simple(String),
    Parameterized { name: String, params: Option<Vec<u32>> },
}

impl FieldTypeConfig {
    pub fn name(&self) -> &str {
        match self {
            FieldTypeConfig::Simple(s) => s.as_str(),
            FieldTypeConfig::Parameterized { name, .. } => name.as_str(),
        }
    }

    pub fn params(&self) -> &[u32] {
        match self {
            FieldTypeConfig::Simple(_) => &[],
            FieldTypeConfig::Parameterized { params, .. } => params.as_deref().unwrap_or(&[]),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: FieldTypeConfig,
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Column default. The store applies it when a record leaves the field unset.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub validation: Option<ValidationRule>,
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Plural model name, e.g. "users". Also the table name unless `table` is set.
    pub name: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    /// Name used for the contextual-store cache key. Required when `name` does not end in "s".
    #[serde(default)]
    pub singular: Option<String>,
    pub primary_key: PrimaryKeyConfig,
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// All model configs in one struct for in-memory loading.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}
