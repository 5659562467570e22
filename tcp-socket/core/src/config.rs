//! Configuration
//!
//! Settings for the session registry and the host bridge, loaded from a TOML
//! file at `~/.config/tcp-socket/config.toml` with environment overrides.
//!
//! # Configuration Priority
//!
//! Values are applied in the following order (highest first):
//! 1. Environment variables
//! 2. TOML configuration file
//! 3. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [socket]
//! default_port = 9100
//! connect_timeout_ms = 10000
//! default_read_len = 1024
//! default_read_timeout_secs = 10
//! max_read_bytes = 1048576
//! default_encoding = "utf8"
//! ```
//!
//! # Environment Variables
//!
//! - `TCP_SOCKET_DEFAULT_PORT`: Port used when a connect request omits one
//! - `TCP_SOCKET_CONNECT_TIMEOUT`: Connect timeout in milliseconds
//! - `TCP_SOCKET_READ_LEN`: Read length used when a request omits one
//! - `TCP_SOCKET_READ_TIMEOUT`: Read timeout in seconds used when a request omits one
//! - `TCP_SOCKET_MAX_READ_BYTES`: Upper bound on a single read
//! - `TCP_SOCKET_ENCODING`: Encoding used when a request omits one

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::Encoding;

/// Port used when a connect request does not name one
pub const DEFAULT_PORT: u16 = 9100;

/// Largest single read accepted by default (1 MiB)
pub const DEFAULT_MAX_READ_BYTES: usize = 1024 * 1024;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Tracks where the configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[socket]` section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketToml {
    /// Port used when a connect request omits one
    pub default_port: Option<u16>,

    /// Connect timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Read length used when a request omits one
    pub default_read_len: Option<usize>,

    /// Read timeout in seconds used when a request omits one
    pub default_read_timeout_secs: Option<u64>,

    /// Upper bound on a single read
    pub max_read_bytes: Option<usize>,

    /// Encoding used when a request omits one
    pub default_encoding: Option<Encoding>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpSocketToml {
    /// Socket configuration section
    pub socket: SocketToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Settings for the session registry and the host bridge
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocketConfig {
    /// Port used when a connect request omits one
    pub default_port: u16,

    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Read length used when a request omits one
    pub default_read_len: usize,

    /// Read timeout in seconds used when a request omits one (0 = no timeout)
    pub default_read_timeout_secs: u64,

    /// Upper bound on a single read
    pub max_read_bytes: usize,

    /// Encoding used when a request omits one
    pub default_encoding: Encoding,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_PORT,
            connect_timeout_ms: 10_000,
            default_read_len: 1024,
            default_read_timeout_secs: 10,
            max_read_bytes: DEFAULT_MAX_READ_BYTES,
            default_encoding: Encoding::Utf8,
        }
    }
}

impl SocketConfig {
    /// Connect timeout as a `Duration`
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Default read timeout as a `Duration`
    #[must_use]
    pub fn default_read_timeout(&self) -> Duration {
        Duration::from_secs(self.default_read_timeout_secs)
    }

    /// Check that the values are usable together
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for a zero connect timeout, a
    /// zero read bound, or a default read length above the read bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "connect_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_read_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_read_bytes must be greater than 0".to_string(),
            ));
        }
        if self.default_read_len == 0 || self.default_read_len > self.max_read_bytes {
            return Err(ConfigError::ValidationError(format!(
                "default_read_len must be between 1 and max_read_bytes ({})",
                self.max_read_bytes
            )));
        }
        Ok(())
    }
}

/// Fully loaded configuration together with its origin
#[derive(Clone, Debug)]
pub struct LoadedConfig {
    /// The effective settings
    pub socket: SocketConfig,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Highest-priority source that contributed a value
    pub source: ConfigSource,
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/tcp-socket/config.toml` or
/// `~/.config/tcp-socket/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tcp-socket").join("config.toml"))
}

/// Load configuration from the default file location and the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if the
/// resulting values fail validation. A missing file is not an error.
pub fn load_config() -> Result<LoadedConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the environment
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the resulting
/// values fail validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<LoadedConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration using `lookup` in place of the process environment
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env<F>(path: Option<PathBuf>, lookup: F) -> Result<LoadedConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut loaded = LoadedConfig {
        socket: SocketConfig::default(),
        config_file_path: None,
        source: ConfigSource::Default,
    };

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: TcpSocketToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut loaded.socket, &toml_config.socket);
            loaded.config_file_path = Some(config_path.clone());
            loaded.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    if apply_env_config(&mut loaded.socket, lookup) {
        loaded.source = ConfigSource::Env;
    }

    loaded.socket.validate()?;
    Ok(loaded)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut SocketConfig, toml: &SocketToml) {
    if let Some(port) = toml.default_port {
        config.default_port = port;
    }
    if let Some(timeout) = toml.connect_timeout_ms {
        config.connect_timeout_ms = timeout;
    }
    if let Some(len) = toml.default_read_len {
        config.default_read_len = len;
    }
    if let Some(timeout) = toml.default_read_timeout_secs {
        config.default_read_timeout_secs = timeout;
    }
    if let Some(max) = toml.max_read_bytes {
        config.max_read_bytes = max;
    }
    if let Some(encoding) = toml.default_encoding {
        config.default_encoding = encoding;
    }
}

/// Apply environment overrides, returning whether any value was taken
fn apply_env_config<F>(config: &mut SocketConfig, lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = false;

    if let Some(port) = lookup("TCP_SOCKET_DEFAULT_PORT").and_then(|v| v.parse().ok()) {
        config.default_port = port;
        applied = true;
    }
    if let Some(ms) = lookup("TCP_SOCKET_CONNECT_TIMEOUT").and_then(|v| v.parse().ok()) {
        config.connect_timeout_ms = ms;
        applied = true;
    }
    if let Some(len) = lookup("TCP_SOCKET_READ_LEN").and_then(|v| v.parse().ok()) {
        config.default_read_len = len;
        applied = true;
    }
    if let Some(secs) = lookup("TCP_SOCKET_READ_TIMEOUT").and_then(|v| v.parse().ok()) {
        config.default_read_timeout_secs = secs;
        applied = true;
    }
    if let Some(max) = lookup("TCP_SOCKET_MAX_READ_BYTES").and_then(|v| v.parse().ok()) {
        config.max_read_bytes = max;
        applied = true;
    }
    if let Some(encoding) = lookup("TCP_SOCKET_ENCODING").and_then(|v| v.parse().ok()) {
        config.default_encoding = encoding;
        applied = true;
    }

    applied
}
