// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use logging::init_logging;
pub use settings::{Config, DatabaseSettings, LogLevel, LoggingSettings};

/// Loads the application configuration from `config.toml` and the environment.
///
/// The file is optional. Environment variables prefixed with `DOCBASE_` and
/// using `__` between nested keys take precedence over it, so
/// `DOCBASE_DATABASE__URI` overrides `[database] uri`. The result is validated
/// before it is returned.
pub fn load_config() -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        // Tells the builder to look for a file named `config.toml`
        .add_source(config::File::with_name("config.toml").required(false))
        .add_source(
            config::Environment::with_prefix("DOCBASE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    finish(settings)
}

/// Loads the configuration from TOML source text, ignoring the environment.
pub fn load_config_from_str(toml: &str) -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    finish(settings)
}

fn finish(settings: config::Config) -> Result<Config, ConfigError> {
    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = settings.try_deserialize::<Config>()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn empty_source_falls_back_to_defaults() {
        let config = load_config_from_str("").unwrap();

        assert_eq!(config.database.uri, "mongodb://localhost:27017");
        assert_eq!(config.database.name, "docbase");
        assert_eq!(config.database.collection, "documents");
        assert_eq!(config.database.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let config = load_config_from_str(
            r#"
            [database]
            uri = "mongodb://db.internal:27017"
            name = "accounts"
            collection = "users"
            connect_timeout_secs = 3

            [logging]
            level = "debug"
            directory = "logs"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.uri, "mongodb://db.internal:27017");
        assert_eq!(config.database.name, "accounts");
        assert_eq!(config.database.collection, "users");
        assert_eq!(config.database.connect_timeout_secs, 3);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.directory, Some(PathBuf::from("logs")));
        assert_eq!(config.logging.file_prefix, "docbase.log");
    }

    #[test]
    fn validation_rejects_empty_names_and_zero_timeout() {
        for source in [
            "[database]\nuri = \"\"",
            "[database]\nname = \" \"",
            "[database]\ncollection = \"\"",
            "[database]\nconnect_timeout_secs = 0",
        ] {
            let err = load_config_from_str(source).unwrap_err();
            assert!(matches!(err, ConfigError::ValidationError(_)), "{source}: {err:?}");
        }
    }

    #[test]
    fn unknown_log_level_is_a_load_error() {
        let err = load_config_from_str("[logging]\nlevel = \"loud\"").unwrap_err();
        assert!(matches!(err, ConfigError::LoadError(_)));
    }
}
