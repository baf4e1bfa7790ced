//! Configuration system for azlaunch.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;

/// Main configuration struct for azlaunch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Authentication server settings
    pub auth: AuthConfig,
    /// Game instance settings
    pub game: GameConfig,
    /// Defaults used when a settings record does not exist yet
    pub defaults: DefaultsConfig,
    /// Local storage settings
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Base URL of the AZauth server (website root)
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Reject accounts that have not verified their email
    pub email_verified: bool,
    /// Online mode: when false no account is refreshed against the server
    pub online: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost/".to_string(),
            timeout_secs: 10,
            email_verified: false,
            online: true,
        }
    }
}

impl AuthConfig {
    /// Base URL with a guaranteed trailing slash.
    pub fn base_url(&self) -> String {
        if self.url.ends_with('/') {
            self.url.clone()
        } else {
            format!("{}/", self.url)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Game version handed to the launch engine
    pub version: String,
    /// Instance directory name under the data directory
    pub data_directory: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            version: "1.20.1".to_string(),
            data_directory: "azlaunch-instance".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Minimum RAM in gigabytes
    pub ram_min: String,
    /// Maximum RAM in gigabytes
    pub ram_max: String,
    /// Default window width
    pub screen_width: String,
    /// Default window height
    pub screen_height: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            ram_min: "2".to_string(),
            ram_max: "4".to_string(),
            screen_width: "1280".to_string(),
            screen_height: "720".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Override for the data directory holding `records.db`
    pub path: Option<PathBuf>,
}

/// Validation result with multiple issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation issues
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new empty validation result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if validation passed (no errors).
    pub fn is_ok(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == IssueSeverity::Error)
    }

    /// Get only error-level issues.
    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Error).collect()
    }

    /// Get only warning-level issues.
    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Warning).collect()
    }

    /// Add an error.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Error,
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning.
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Warning,
            field: field.into(),
            message: message.into(),
        });
    }
}

/// A single validation issue.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue
    pub severity: IssueSeverity,
    /// Field path (e.g., "auth.url")
    pub field: String,
    /// Human-readable message
    pub message: String,
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Warnings don't prevent loading
    Warning,
    /// Errors prevent loading
    Error,
}

impl Config {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    /// The layered figment: defaults, user config file, then `AZLAUNCH_` env vars.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(Self::config_dir().join("config.toml")))
            .merge(Env::prefixed("AZLAUNCH_").split("__"))
    }

    /// Load and validate configuration.
    pub fn load_validated() -> Result<Self, Error> {
        let config = Self::load().map_err(|e| Error::Config(e.to_string()))?;
        let result = config.validate();

        if !result.is_ok() {
            let errors: Vec<String> = result
                .errors()
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            return Err(Error::Config(format!(
                "Configuration validation failed:\n  {}",
                errors.join("\n  ")
            )));
        }

        for warning in result.warnings() {
            tracing::warn!("Config warning - {}: {}", warning.field, warning.message);
        }

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if !self.auth.url.starts_with("http://") && !self.auth.url.starts_with("https://") {
            result.add_error("auth.url", "url must start with http:// or https://");
        } else if self.auth.url.starts_with("http://") && !self.auth.url.contains("localhost") {
            result.add_warning("auth.url", "credentials will be sent over plain http");
        }

        if self.auth.timeout_secs == 0 {
            result.add_error("auth.timeout_secs", "timeout_secs must be greater than 0");
        }

        if self.game.data_directory.is_empty() {
            result.add_error("game.data_directory", "data_directory cannot be empty");
        }

        match (
            self.defaults.ram_min.parse::<f64>(),
            self.defaults.ram_max.parse::<f64>(),
        ) {
            (Ok(min), Ok(max)) if min > max => {
                result.add_error("defaults.ram_min", "ram_min cannot exceed ram_max");
            }
            (Ok(_), Ok(_)) => {}
            _ => result.add_error("defaults.ram_min", "ram_min and ram_max must be numbers"),
        }

        result
    }

    /// Get the configuration directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("azlaunch"))
            .unwrap_or_else(|| PathBuf::from("~/.config/azlaunch"))
    }

    /// Get the data directory (record store, game instance).
    pub fn data_dir(&self) -> PathBuf {
        if let Some(ref path) = self.storage.path {
            return path.clone();
        }
        dirs::data_dir()
            .map(|p| p.join("azlaunch"))
            .unwrap_or_else(|| PathBuf::from("~/.local/share/azlaunch"))
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_ok(), "Default config should be valid: {:?}", result.issues);
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.auth.url = "ftp://example.com".to_string();
        let result = config.validate();
        assert!(!result.is_ok());
        assert!(result.errors().iter().any(|e| e.field == "auth.url"));
    }

    #[test]
    fn test_plain_http_is_warning() {
        let mut config = Config::default();
        config.auth.url = "http://play.example.com".to_string();
        let result = config.validate();
        assert!(result.is_ok());
        assert!(result.warnings().iter().any(|e| e.field == "auth.url"));
    }

    #[test]
    fn test_ram_order() {
        let mut config = Config::default();
        config.defaults.ram_min = "8".to_string();
        config.defaults.ram_max = "4".to_string();
        assert!(!config.validate().is_ok());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let mut auth = AuthConfig::default();
        auth.url = "https://example.com".to_string();
        assert_eq!(auth.base_url(), "https://example.com/");
        auth.url = "https://example.com/".to_string();
        assert_eq!(auth.base_url(), "https://example.com/");
    }

    #[test]
    fn test_env_override() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("AZLAUNCH_AUTH__URL", "https://mc.example.com");
            jail.set_env("AZLAUNCH_AUTH__EMAIL_VERIFIED", "true");
            let config: Config = Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Env::prefixed("AZLAUNCH_").split("__"))
                .extract()?;
            assert_eq!(config.auth.url, "https://mc.example.com");
            assert!(config.auth.email_verified);
            assert_eq!(config.auth.timeout_secs, 10);
            Ok(())
        });
    }
}
