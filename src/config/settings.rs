//! Runtime settings from the environment.

use crate::error::ConfigError;
use std::path::PathBuf;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/architect";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    /// Directory holding `models.json`.
    pub models_path: PathBuf,
    pub bind_addr: String,
    pub max_connections: u32,
    pub body_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: DEFAULT_DATABASE_URL.into(),
            models_path: PathBuf::from("models"),
            bind_addr: DEFAULT_BIND_ADDR.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl Settings {
    /// Read `DATABASE_URL`, `MODELS_PATH`, `BIND_ADDR`, `DATABASE_MAX_CONNECTIONS` and `BODY_LIMIT_BYTES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::Load(format!("DATABASE_MAX_CONNECTIONS: invalid number '{}'", v)))?,
            None => defaults.max_connections,
        };
        let body_limit = match lookup("BODY_LIMIT_BYTES") {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::Load(format!("BODY_LIMIT_BYTES: invalid number '{}'", v)))?,
            None => defaults.body_limit,
        };
        Ok(Settings {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            models_path: lookup("MODELS_PATH").map(PathBuf::from).unwrap_or(defaults.models_path),
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_connections,
            body_limit,
        })
    }
}
