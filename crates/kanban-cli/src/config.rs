//! Application configuration loaded from a TOML file.
//!
//! ```toml
//! [reader]
//! backend = "pcsc"
//! name_filter = "ACR122"
//! poll_interval_ms = 200
//!
//! [controller]
//! card_wait_timeout_ms = 10000
//!
//! [logging]
//! filter = "info,kanban_hardware=debug"
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use kanban_controller::ControllerConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default substring matched against PC/SC reader names.
pub const DEFAULT_NAME_FILTER: &str = "ACR122";

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reader: ReaderConfig,
    pub controller: ControllerConfig,
    pub logging: LoggingConfig,
}

/// Which reader implementation to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Pcsc,
    Simulated,
}

impl Default for Backend {
    /// PC/SC when compiled in, the simulated reader otherwise.
    fn default() -> Self {
        if cfg!(feature = "pcsc") {
            Self::Pcsc
        } else {
            Self::Simulated
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub backend: Backend,

    /// Case-insensitive substring a PC/SC reader name must contain.
    pub name_filter: String,

    /// Delay between card polls while waiting; the backend default if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
}

impl ReaderConfig {
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_ms.map(Duration::from_millis)
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            name_filter: DEFAULT_NAME_FILTER.to_string(),
            poll_interval_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Load the configuration, falling back to defaults without a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the controller timings are invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::parse(&content)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            Some(path) => {
                debug!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn validate(&self) -> Result<()> {
        self.controller.validate()?;
        if self.reader.poll_interval_ms == Some(0) {
            anyhow::bail!("reader.poll_interval_ms must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.reader.name_filter, "ACR122");
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.reader.poll_interval(), None);
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = AppConfig::parse(
            r#"
            [reader]
            backend = "simulated"
            name_filter = "ACS"
            poll_interval_ms = 150

            [controller]
            removal_timeout_ms = 2000

            [logging]
            filter = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.reader.backend, Backend::Simulated);
        assert_eq!(config.reader.name_filter, "ACS");
        assert_eq!(
            config.reader.poll_interval(),
            Some(Duration::from_millis(150))
        );
        assert_eq!(config.controller.removal_timeout_ms, 2000);
        assert_eq!(config.controller.card_wait_timeout_ms, 10_000);
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(AppConfig::parse("[reader]\nbackend = \"serial\"").is_err());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = AppConfig::parse("[reader]\npoll_interval_ms = 0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load(Some(Path::new("/nonexistent/kanban.toml"))).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
