//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files, a `.env` file, and environment variable
//! overrides (which always win).

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub salesforce: SalesforceConfig,

    #[serde(default)]
    pub reporting: ReportingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Salesforce connection configuration
///
/// Either `access_token` + `instance_url` (bearer mode) or `username` +
/// `password` + `security_token` (SOAP login mode) must be set.
#[derive(Clone, Deserialize)]
pub struct SalesforceConfig {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub security_token: String,

    /// Login host prefix: `login` for production, `test` for sandboxes
    #[serde(default = "default_domain")]
    pub domain: String,

    #[serde(default)]
    pub access_token: String,

    #[serde(default)]
    pub instance_url: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_domain() -> String {
    "login".to_string()
}

fn default_api_version() -> String {
    "59.0".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl SalesforceConfig {
    /// Bearer mode is used when both token and instance URL are present
    pub fn uses_access_token(&self) -> bool {
        !self.access_token.is_empty() && !self.instance_url.is_empty()
    }

    /// Check that one of the two auth modes is fully configured
    pub fn is_configured(&self) -> bool {
        self.uses_access_token() || (!self.username.is_empty() && !self.password.is_empty())
    }
}

impl Default for SalesforceConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            security_token: String::new(),
            domain: default_domain(),
            access_token: String::new(),
            instance_url: String::new(),
            api_version: default_api_version(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// Credentials stay out of logs
impl std::fmt::Debug for SalesforceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "***" };
        f.debug_struct("SalesforceConfig")
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("security_token", &redact(&self.security_token))
            .field("domain", &self.domain)
            .field("access_token", &redact(&self.access_token))
            .field("instance_url", &self.instance_url)
            .field("api_version", &self.api_version)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Report defaults
#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    /// Hours in a working day for utilization
    #[serde(default = "default_daily_capacity")]
    pub daily_capacity_hours: f64,

    /// Rows shown for ad-hoc queries
    #[serde(default = "default_max_display_rows")]
    pub max_display_rows: usize,

    /// Default target for the daily budget
    #[serde(default = "default_daily_target")]
    pub daily_target_hours: f64,
}

fn default_daily_capacity() -> f64 {
    8.0
}

fn default_max_display_rows() -> usize {
    200
}

fn default_daily_target() -> f64 {
    8.0
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            daily_capacity_hours: default_daily_capacity(),
            max_display_rows: default_max_display_rows(),
            daily_target_hours: default_daily_target(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    ///
    /// A `.env` file in the working directory (or a parent) is read first so
    /// its variables take part in the overrides.
    pub fn load_default() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {:?}", path);
        }

        let config_paths = [
            dirs::config_dir().map(|p| p.join("sfpm").join("config.toml")),
            Some(PathBuf::from("/etc/sfpm/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any variable lookup
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Salesforce overrides
        let sf = &mut self.salesforce;
        for (key, slot) in [
            ("SF_USERNAME", &mut sf.username),
            ("SF_PASSWORD", &mut sf.password),
            ("SF_SECURITY_TOKEN", &mut sf.security_token),
            ("SF_DOMAIN", &mut sf.domain),
            ("SF_ACCESS_TOKEN", &mut sf.access_token),
            ("SF_INSTANCE_URL", &mut sf.instance_url),
            ("SF_API_VERSION", &mut sf.api_version),
        ] {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }

        // Reporting overrides
        if let Some(capacity) = lookup("SFPM_DAILY_CAPACITY") {
            match capacity.parse() {
                Ok(hours) => self.reporting.daily_capacity_hours = hours,
                Err(_) => tracing::warn!("Ignoring invalid SFPM_DAILY_CAPACITY: {}", capacity),
            }
        }

        // Logging overrides
        if let Some(level) = lookup("SFPM_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("SFPM_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# sfpm Configuration
#
# Environment variables (and a .env file) override these settings:
# - SF_USERNAME, SF_PASSWORD, SF_SECURITY_TOKEN, SF_DOMAIN
# - SF_ACCESS_TOKEN, SF_INSTANCE_URL, SF_API_VERSION
# - SFPM_DAILY_CAPACITY
# - SFPM_LOG_LEVEL
# - SFPM_LOG_FORMAT

[salesforce]
# Username + password + security token login
username = ""
password = ""
security_token = ""

# Login host: "login" for production, "test" for sandboxes
domain = "login"

# Or an existing session: access token + instance URL
# access_token = ""
# instance_url = "https://yourorg.my.salesforce.com"

# REST API version
api_version = "59.0"

# Request timeout in seconds
request_timeout_secs = 30

[reporting]
# Working hours per day, used for utilization percentages
daily_capacity_hours = 8.0

# Maximum rows shown for ad-hoc queries
max_display_rows = 200

# Default target for the daily budget
daily_target_hours = 8.0

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
