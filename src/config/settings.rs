//! Application settings loaded from config.toml
//!
//! Every section has defaults, so a missing file or a partial file is fine. A few
//! deployment values can be overridden from the environment by the binary; the
//! rest of the crate only ever sees the resulting [`AppConfig`].

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Database settings
    pub database: DatabaseConfig,
    /// Attendance trigger settings
    pub attendance: AttendanceConfig,
    /// In-process interval runner settings
    pub scheduler: SchedulerConfig,
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8000".to_string(),
        }
    }
}

/// `[database]` section
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SeaORM` connection URL
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/school.sqlite?mode=rwc".to_string(),
        }
    }
}

/// `[attendance]` section
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AttendanceConfig {
    /// Shared secret expected as `Authorization: Bearer <token>` on the trigger endpoints
    pub api_token: Option<String>,
}

/// `[scheduler]` section
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Run the generation and autosave passes inside the server process
    pub enabled: bool,
    /// Seconds between generation passes
    pub generate_interval_secs: u64,
    /// Seconds between autosave passes
    pub autosave_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            generate_interval_secs: 300,
            autosave_interval_secs: 600,
        }
    }
}

impl AppConfig {
    /// Applies deployment overrides (`DATABASE_URL`, `BIND_ADDRESS`,
    /// `ATTENDANCE_API_TOKEN`) using the given lookup, usually `std::env::var`.
    ///
    /// Empty values are ignored, so an empty `ATTENDANCE_API_TOKEN` never
    /// becomes a valid credential.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(addr) = non_empty("BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
        if let Some(token) = non_empty("ATTENDANCE_API_TOKEN") {
            self.attendance.api_token = Some(token);
        }
        self
    }

    /// Checks values serde cannot express.
    ///
    /// # Errors
    /// Returns [`Error::Config`] when a scheduler interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.generate_interval_secs == 0 || self.scheduler.autosave_interval_secs == 0
        {
            return Err(Error::Config {
                message: "Scheduler intervals must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Applies the overrides, then validates the result. This is the single
    /// check the binary runs before using the configuration.
    ///
    /// # Errors
    /// See [`AppConfig::validate`].
    pub fn resolve<F>(self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = self.with_overrides(lookup);
        config.validate()?;
        Ok(config)
    }
}

/// Parses configuration from TOML text. Values are checked later, by
/// [`AppConfig::resolve`], once the environment overrides are applied.
///
/// # Errors
/// Returns an error if the TOML syntax is invalid.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from a TOML file
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;
    parse_config(&contents)
}

/// Loads configuration from the default location (./config.toml), falling back to
/// defaults when the file does not exist.
pub fn load_default_config() -> Result<AppConfig> {
    let path = Path::new("config.toml");
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!("No config.toml found, using default settings");
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            bind_address = "0.0.0.0:9000"

            [database]
            url = "sqlite::memory:"

            [attendance]
            api_token = "secret"

            [scheduler]
            enabled = true
            generate_interval_secs = 120
            autosave_interval_secs = 240
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:9000");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.attendance.api_token.as_deref(), Some("secret"));
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.generate_interval_secs, 120);
        assert_eq!(config.scheduler.autosave_interval_secs, 240);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = parse_config("[attendance]\napi_token = \"abc\"\n").unwrap();
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.scheduler, SchedulerConfig::default());
        assert!(!config.scheduler.enabled);
        assert_eq!(config.scheduler.generate_interval_secs, 300);
        assert_eq!(config.scheduler.autosave_interval_secs, 600);
    }

    #[test]
    fn test_zero_interval_rejected_after_overrides() {
        let config = parse_config("[scheduler]\ngenerate_interval_secs = 0\n").unwrap();
        assert_eq!(config.scheduler.generate_interval_secs, 0);

        let result = config.resolve(|_| None);
        assert!(matches!(result, Err(Error::Config { .. })));
        assert!(AppConfig::default().resolve(|_| None).is_ok());
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let result = parse_config("[server\nbind_address = 1");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_overrides_apply_and_ignore_empty_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "sqlite::memory:"),
            ("BIND_ADDRESS", "   "),
            ("ATTENDANCE_API_TOKEN", "from-env"),
        ]);
        let config =
            AppConfig::default().with_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.server.bind_address, "127.0.0.1:8000");
        assert_eq!(config.attendance.api_token.as_deref(), Some("from-env"));
    }
}
