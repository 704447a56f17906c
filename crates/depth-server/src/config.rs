// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server configuration module
//!
//! This module provides configuration structures and loading logic for the
//! depth server: listener URIs, request limits, environment and logging.

use std::{fmt, path::Path, time::Duration};

use anyhow::{Context, Result, anyhow, bail, ensure};
use config::{
    Config, ConfigError, Environment as ConfigEnv, File,
    builder::{ConfigBuilder, DefaultState},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use url::Url;

use crate::error::{ServerError, ServerResult};

/// Listener used when nothing else is configured
pub const DEFAULT_LISTEN_URI: &str = "http://127.0.0.1:8080/";

const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024; // 1MB
const MAX_BODY_BYTES_CEILING: usize = 64 * 1024 * 1024;

/// An `http://host:port/prefix/` address the server listens on
///
/// Hosts `+` and `*` bind every interface. The path is the prefix request
/// paths must fall under, always normalized to end with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenUri {
    uri: Url,
    host: String,
    port: u16,
    prefix: String,
}

impl ListenUri {
    /// Parse a listen URI
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a URL, does not use the `http`
    /// scheme or has no host.
    pub fn parse(input: &str) -> Result<Self> {
        let uri = Url::parse(input).with_context(|| format!("invalid listen URI '{input}'"))?;
        ensure!(
            uri.scheme() == "http",
            "listen URI '{input}' must use the http scheme"
        );

        let host = match uri.host_str() {
            Some("+" | "*") => "0.0.0.0".to_string(),
            Some(host) => host.trim_start_matches('[').trim_end_matches(']').to_string(),
            None => bail!("listen URI '{input}' has no host"),
        };
        let port = uri
            .port_or_known_default()
            .ok_or_else(|| anyhow!("listen URI '{input}' has no port"))?;

        let mut prefix = uri.path().to_string();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }

        Ok(Self {
            uri,
            host,
            port,
            prefix,
        })
    }

    /// Host to bind, with wildcards resolved
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port to bind, `0` lets the OS choose
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Path prefix served on this listener, always ending with `/`
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `host:port` form accepted by `TcpListener::bind`
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for ListenUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri.as_str())
    }
}

impl Serialize for ListenUri {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.uri.as_str())
    }
}

impl<'de> Deserialize<'de> for ListenUri {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(|e| de::Error::custom(format!("{e:#}")))
    }
}

/// A validated timeout duration in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeoutSeconds(Duration);

impl TimeoutSeconds {
    /// Create a new `TimeoutSeconds`, ensuring the value is within valid bounds
    ///
    /// # Errors
    ///
    /// Returns an error if timeout is 0 or greater than 300 seconds
    pub fn new(seconds: u64) -> Result<Self> {
        ensure!(seconds != 0, "timeout must be greater than 0");
        ensure!(seconds <= 300, "timeout cannot exceed 300");
        Ok(Self(Duration::from_secs(seconds)))
    }

    /// Create a safe default timeout (30 seconds)
    pub const fn default_value() -> Self {
        Self(Duration::from_secs(30))
    }

    /// Create a safe testing timeout (5 seconds)
    pub const fn testing() -> Self {
        Self(Duration::from_secs(5))
    }

    /// Get the timeout duration
    pub fn value(&self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for TimeoutSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Self::new(seconds).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Default for TimeoutSeconds {
    fn default() -> Self {
        Self::default_value()
    }
}

/// Largest request body the server will read, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BodyLimit(usize);

impl BodyLimit {
    /// Create a new `BodyLimit`
    ///
    /// # Errors
    ///
    /// Returns an error if the limit is 0 or above 64 MiB
    pub fn new(bytes: usize) -> Result<Self> {
        ensure!(bytes != 0, "body limit must be greater than 0");
        ensure!(
            bytes <= MAX_BODY_BYTES_CEILING,
            "body limit cannot exceed {MAX_BODY_BYTES_CEILING} bytes"
        );
        Ok(Self(bytes))
    }

    /// Limit in bytes
    pub fn value(&self) -> usize {
        self.0
    }
}

impl<'de> Deserialize<'de> for BodyLimit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = usize::deserialize(deserializer)?;
        Self::new(bytes).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Default for BodyLimit {
    fn default() -> Self {
        Self(DEFAULT_MAX_BODY_BYTES)
    }
}

/// Environment types for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production environment
    Production,
    /// Development environment
    Development,
    /// Testing environment
    Testing,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
            Environment::Testing => write!(f, "testing"),
        }
    }
}

/// Console logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Colour log lines by level
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            ansi: true,
        }
    }
}

/// Server configuration for different environments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Addresses and path prefixes to serve
    pub listen: Vec<ListenUri>,
    /// Request timeout in seconds (validated range: 1-300)
    pub timeout_seconds: TimeoutSeconds,
    /// Largest accepted request body
    #[serde(default)]
    pub max_body_bytes: BodyLimit,
    /// Environment type
    pub environment: Environment,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: vec![default_listen_uri()],
            timeout_seconds: TimeoutSeconds::default(),
            max_body_bytes: BodyLimit::default(),
            environment: Environment::Development,
            log: LogConfig::default(),
        }
    }
}

#[allow(clippy::expect_used)]
fn default_listen_uri() -> ListenUri {
    ListenUri::parse(DEFAULT_LISTEN_URI).expect("default listen URI is valid")
}

fn config_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("listen", vec![DEFAULT_LISTEN_URI])?
        .set_default("timeout_seconds", 30)?
        .set_default("max_body_bytes", i64::try_from(DEFAULT_MAX_BODY_BYTES).unwrap_or(i64::MAX))?
        .set_default("environment", "development")?
        .set_default("log.filter", "info")?
        .set_default("log.ansi", true)
}

/// `SERVER_` variables, `__` between nested keys, comma-separated `SERVER_LISTEN`
fn env_overrides() -> ConfigEnv {
    ConfigEnv::with_prefix("SERVER")
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("listen")
        .try_parsing(true)
}

impl ServerConfig {
    /// Create configuration from environment variables and optional configuration files
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if configuration is invalid or cannot be loaded.
    pub fn from_env(config_file: Option<&Path>) -> ServerResult<Self> {
        Self::load(config_file).map_err(|e| ServerError::Config {
            message: format!("failed to load configuration: {e}"),
        })
    }

    /// Load configuration using the config crate with hierarchical sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. Configuration file (config.json)
    /// 3. Environment-specific files (config.{env}.json)
    /// 4. The explicit `config_file`, if given (must exist)
    /// 5. Environment variables with `SERVER_` prefix, `__` between nested keys
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let env_var = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let mut config_builder = config_defaults()?
            .add_source(File::with_name("config.json").required(false))
            .add_source(
                File::with_name(&format!("config.{}.json", env_var.to_lowercase())).required(false),
            );

        if let Some(path) = config_file {
            config_builder = config_builder.add_source(File::from(path).required(true));
        }

        config_builder = config_builder.add_source(env_overrides());

        if std::env::var("ENVIRONMENT").is_ok() {
            config_builder = config_builder.set_override("environment", env_var.to_lowercase())?;
        }

        let server_config: Self = config_builder.build()?.try_deserialize()?;
        server_config
            .validate()
            .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;

        Ok(server_config)
    }

    /// Check rules that span several fields
    ///
    /// # Errors
    ///
    /// Returns an error if no listener is configured, or a listener uses port 0
    /// outside the testing environment.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.listen.is_empty(), "at least one listen URI is required");
        for uri in &self.listen {
            ensure!(
                uri.port() != 0 || self.environment == Environment::Testing,
                "listen URI '{uri}' cannot use port 0 in non-testing environments"
            );
        }
        Ok(())
    }

    /// Replace the configured listeners, e.g. with URIs from the command line
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the resulting configuration is invalid.
    pub fn with_listen(mut self, listen: Vec<ListenUri>) -> ServerResult<Self> {
        self.listen = listen;
        self.validate().map_err(|e| ServerError::Config {
            message: format!("invalid listen configuration: {e}"),
        })?;
        Ok(self)
    }

    /// Create configuration optimized for testing
    pub fn for_testing() -> Self {
        #[allow(clippy::expect_used)]
        let listen = ListenUri::parse("http://127.0.0.1:0/").expect("testing listen URI is valid");

        Self {
            listen: vec![listen], // let OS choose available port
            timeout_seconds: TimeoutSeconds::testing(),
            max_body_bytes: BodyLimit::default(),
            environment: Environment::Testing,
            log: LogConfig::default(),
        }
    }
}
