use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where the document store lives and which collection the CLI works on.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// A MongoDB connection string (e.g., "mongodb://localhost:27017").
    #[serde(default = "default_uri")]
    pub uri: String,
    /// The database name. Created by the server on first write.
    #[serde(default = "default_database")]
    pub name: String,
    /// The default collection for CLI commands.
    #[serde(default = "default_collection")]
    pub collection: String,
    /// How long the caller waits for the connect-and-ping handshake.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            name: default_database(),
            collection: default_collection(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl DatabaseSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Controls the tracing subscriber installed by `init_logging`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Used when `RUST_LOG` is not set.
    #[serde(default)]
    pub level: LogLevel,
    /// When set, logs are also written to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            directory: None,
            file_prefix: default_file_prefix(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl Config {
    /// Rejects settings that would only fail later, at connect time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let db = &self.database;
        if db.uri.trim().is_empty() {
            return Err(ConfigError::ValidationError("database.uri must not be empty".to_string()));
        }
        if db.name.trim().is_empty() {
            return Err(ConfigError::ValidationError("database.name must not be empty".to_string()));
        }
        if db.collection.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "database.collection must not be empty".to_string(),
            ));
        }
        if db.connect_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "database.connect_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "docbase".to_string()
}

fn default_collection() -> String {
    "documents".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_file_prefix() -> String {
    "docbase.log".to_string()
}
