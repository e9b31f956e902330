// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Layers, later wins: built-in defaults, `easymeal.toml` (or an explicit
//! path), then `EASYMEAL_`-prefixed environment variables where `__`
//! separates sections, e.g. `EASYMEAL_AUTH__SECRET_KEY`.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zeroize::Zeroize;

pub const DEFAULT_CONFIG_FILE: &str = "easymeal.toml";
pub const ENV_PREFIX: &str = "EASYMEAL_";

/// Minimum signing secret length in bytes
pub const MIN_SECRET_LEN: usize = 16;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A configuration value that never shows up in logs
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    /// Default tracing level when `RUST_LOG` is unset
    pub log_level: String,
    pub auth: AuthSettings,
    pub database: DatabaseSettings,
    pub object_store: ObjectStoreSettings,
    pub migration: MigrationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: SocketAddr,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HS256 signing secret; rotating it invalidates every token
    pub secret_key: Secret,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// PostgreSQL URL; unset selects the in-memory store
    pub url: Option<Secret>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreSettings {
    /// S3/MinIO endpoint, `http(s)://host:port` or bare `host:port`.
    /// Unset selects the in-memory store.
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: Secret,
    pub bucket: String,
    pub region: String,
    /// Authority clients use to reach the object store
    pub external_endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    pub legacy_db_path: PathBuf,
    pub photos_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            log_level: "info".to_string(),
            auth: AuthSettings::default(),
            database: DatabaseSettings::default(),
            object_store: ObjectStoreSettings::default(),
            migration: MigrationSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

impl Default for ObjectStoreSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_key: "minioadmin".to_string(),
            secret_key: Secret::new("minioadmin"),
            bucket: "photos".to_string(),
            region: "us-east-1".to_string(),
            external_endpoint: None,
        }
    }
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            legacy_db_path: PathBuf::from("data/meals.db"),
            photos_dir: PathBuf::from("data/photos"),
        }
    }
}

impl Settings {
    /// The layered provider, exposed so callers can add their own layers
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let file = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load settings without validating them
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        Ok(Self::figment(config_path).extract()?)
    }

    /// Check the settings the server needs to start
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret_key.is_empty() {
            return Err(ConfigError::Invalid(
                "auth.secret_key must be set".to_string(),
            ));
        }
        if self.auth.secret_key.expose().len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "auth.secret_key must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        self.validate_common()
    }

    /// Checks shared by every binary
    pub fn validate_common(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log_level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }
        if self.object_store.bucket.is_empty() {
            return Err(ConfigError::Invalid(
                "object_store.bucket must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
