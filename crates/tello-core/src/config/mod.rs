//! Configuration parsing and management.
//!
//! This module handles parsing of the renewal configuration file (TOML)
//! that defines the state folder, renewal window, timezone, and the
//! external client command.

use std::path::PathBuf;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Top-level renewal configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RenewalConfig {
    /// Renewal decision settings.
    #[serde(default)]
    pub renewal: RenewalSection,

    /// External renewal client settings.
    #[serde(default)]
    pub client: ClientSection,
}

impl RenewalConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// Validation fails fast at load time so that an unknown timezone or a
    /// zero-day window never surfaces mid-decision.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid, `days_before_renewal` is
    /// zero, or `timezone` does not name a known IANA timezone.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Resolve the configured civil timezone.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the identifier is not a known IANA
    /// timezone.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.renewal.timezone.parse::<Tz>().map_err(|_| {
            ConfigError::Validation(format!(
                "unknown timezone '{}' in [renewal] section",
                self.renewal.timezone
            ))
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.renewal.days_before_renewal == 0 {
            return Err(ConfigError::Validation(
                "renewal.days_before_renewal must be a positive number of days".to_string(),
            ));
        }
        self.timezone()?;
        Ok(())
    }
}

/// Renewal decision settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalSection {
    /// Directory holding the due-date and run-state records.
    #[serde(default = "default_state_folder")]
    pub state_folder_path: PathBuf,

    /// Attempt renewal when the due date is at most this many days away.
    #[serde(default = "default_days_before_renewal")]
    pub days_before_renewal: u32,

    /// Civil timezone used for all calendar-day comparisons.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for RenewalSection {
    fn default() -> Self {
        Self {
            state_folder_path: default_state_folder(),
            days_before_renewal: default_days_before_renewal(),
            timezone: default_timezone(),
        }
    }
}

/// External renewal client settings.
///
/// The browser-automation client is out of process; the CLI invokes the
/// configured command with `observe` or `renew` appended and reads the
/// observed due date from its stdout.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientSection {
    /// Command line (program plus leading arguments) of the renewal client.
    #[serde(default)]
    pub command: Vec<String>,
}

fn default_state_folder() -> PathBuf {
    PathBuf::from(".tello_state")
}

const fn default_days_before_renewal() -> u32 {
    2
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = RenewalConfig::from_toml("").unwrap();
        assert_eq!(
            config.renewal.state_folder_path,
            PathBuf::from(".tello_state")
        );
        assert_eq!(config.renewal.days_before_renewal, 2);
        assert_eq!(config.renewal.timezone, "UTC");
        assert!(config.client.command.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [renewal]
            state_folder_path = "/var/lib/tello/state"
            days_before_renewal = 23
            timezone = "America/New_York"

            [client]
            command = ["/usr/local/bin/tello-web", "--headless"]
        "#;

        let config = RenewalConfig::from_toml(toml).unwrap();
        assert_eq!(
            config.renewal.state_folder_path,
            PathBuf::from("/var/lib/tello/state")
        );
        assert_eq!(config.renewal.days_before_renewal, 23);
        assert_eq!(config.timezone().unwrap(), chrono_tz::America::New_York);
        assert_eq!(config.client.command.len(), 2);
    }

    #[test]
    fn config_rejects_unknown_timezone() {
        let toml = r#"
            [renewal]
            timezone = "Mars/Olympus_Mons"
        "#;

        let err = RenewalConfig::from_toml(toml).unwrap_err();
        match err {
            ConfigError::Validation(msg) => {
                assert!(msg.contains("Mars/Olympus_Mons"), "unexpected: {msg}");
            },
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn config_rejects_zero_day_window() {
        let toml = r#"
            [renewal]
            days_before_renewal = 0
        "#;

        let err = RenewalConfig::from_toml(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)), "got {err:?}");
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let toml = r#"
            [renewal]
            days_before_renewal = 5
            timezone = "Europe/Berlin"
        "#;

        let config = RenewalConfig::from_toml(toml).unwrap();
        let rendered = config.to_toml().unwrap();
        let reparsed = RenewalConfig::from_toml(&rendered).unwrap();
        assert_eq!(reparsed.renewal.days_before_renewal, 5);
        assert_eq!(reparsed.renewal.timezone, "Europe/Berlin");
    }
}
