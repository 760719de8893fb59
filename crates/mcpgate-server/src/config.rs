//! Server configuration
//!
//! Loaded from a TOML, YAML, or JSON file, with `MCPGATE_*` environment
//! variables layered on top. Nested keys use `__`, e.g.
//! `MCPGATE_LOGGING__LEVEL=debug`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mcpgate_auth::VerifierConfig;
use serde::{Deserialize, Serialize};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "MCPGATE";

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,
    /// Public URL of the protected MCP endpoint
    pub resource_url: String,
    /// Authorization servers advertised in the resource metadata
    pub authorization_servers: Vec<String>,
    /// Whole-request timeout (seconds)
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// Logging setup
    pub logging: LoggingConfig,
    /// Credential verification
    pub auth: VerifierConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3001".to_string(),
            resource_url: "http://0.0.0.0:3001/mcp".to_string(),
            authorization_servers: vec!["https://auth.example.com".to_string()],
            request_timeout: Duration::from_secs(30),
            logging: LoggingConfig::default(),
            auth: VerifierConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Unsupported file format
    #[error("Unsupported configuration file format. Use .toml, .yaml, .yml, or .json")]
    UnsupportedFormat,

    /// Configuration parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),
}

impl ServerConfig {
    /// Load configuration from a file, with environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file doesn't exist
    /// - The file format is unsupported
    /// - The file contains invalid configuration
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_file_with_prefix(path, ENV_PREFIX)
    }

    /// Load configuration from a file with a custom environment prefix
    ///
    /// # Errors
    ///
    /// Same as [`from_file`](Self::from_file).
    pub fn from_file_with_prefix(
        path: impl AsRef<Path>,
        env_prefix: &str,
    ) -> Result<Self, ConfigError> {
        use config::{Config, Environment, File, FileFormat};

        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("yaml" | "yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => return Err(ConfigError::UnsupportedFormat),
        };

        let config = Config::builder()
            .add_source(File::new(
                path.to_str().ok_or(ConfigError::UnsupportedFormat)?,
                format,
            ))
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// URL of this server's protected resource metadata document
    pub fn resource_metadata_url(&self) -> String {
        let origin = self
            .resource_url
            .find("://")
            .and_then(|scheme_end| {
                self.resource_url[scheme_end + 3..]
                    .find('/')
                    .map(|path_start| &self.resource_url[..scheme_end + 3 + path_start])
            })
            .unwrap_or(&self.resource_url);
        format!(
            "{origin}{}",
            mcpgate_auth::server::PROTECTED_RESOURCE_METADATA_PATH
        )
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
