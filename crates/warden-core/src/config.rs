// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Configuration management for Warden.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::policy::RuleSet;

/// Main configuration for the Warden server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Access rule configuration.
    pub rules: RulesConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(crate::Error::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed.
    pub fn parse(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Load configuration from `path`, or defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first problem found.
    pub fn validate(&self) -> crate::Result<()> {
        if self.auth.admin_token.trim().is_empty() {
            return Err(crate::Error::Config("auth.admin_token must not be empty".to_string()));
        }
        if self.rules.file.is_none() {
            if self.rules.max_upload_bytes == 0 {
                return Err(crate::Error::Config(
                    "rules.max_upload_bytes must be greater than zero".to_string(),
                ));
            }
            if self.rules.extensions.is_empty() {
                return Err(crate::Error::Config(
                    "rules.extensions must list at least one extension".to_string(),
                ));
            }
        }
        if self.storage.backend == StorageBackendKind::Local
            && self.storage.data_dir.as_os_str().is_empty()
        {
            return Err(crate::Error::Config(
                "storage.data_dir is required for the local backend".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the access rules: the rules file if one is configured,
    /// otherwise the built-in per-user image rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules file cannot be loaded or the rules are
    /// invalid.
    pub fn load_rules(&self) -> crate::Result<RuleSet> {
        match &self.rules.file {
            Some(path) => RuleSet::from_file(path),
            None => RuleSet::user_images(&self.rules),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind: SocketAddr,
    /// Maximum request body size in bytes.
    /// Default: 32 MiB. Set to 0 for unlimited.
    pub max_body_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 9199)),
            max_body_size: 32 * 1024 * 1024,
        }
    }
}

/// Which object store backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// Objects live in memory and vanish on restart.
    #[default]
    Memory,
    /// Objects are persisted under `data_dir`.
    Local,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selection.
    pub backend: StorageBackendKind,
    /// Directory for the local backend.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { backend: StorageBackendKind::Memory, data_dir: PathBuf::from("./data") }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer token that bypasses the access rules.
    pub admin_token: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { admin_token: "owner".to_string() }
    }
}

/// Access rule configuration.
///
/// When `file` is set the rules are read from it and the remaining fields
/// are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Optional TOML rules file replacing the built-in rules.
    pub file: Option<PathBuf>,
    /// Uploads must be strictly smaller than this many bytes.
    /// Default: 100 KiB.
    pub max_upload_bytes: u64,
    /// Content type uploads must declare.
    pub content_type: String,
    /// File extensions uploads may use, without the dot.
    pub extensions: Vec<String>,
    /// Directory holding one sub-directory per user.
    pub owner_root: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            file: None,
            max_upload_bytes: 100 * 1024,
            content_type: "image/png".to_string(),
            extensions: vec!["png".to_string()],
            owner_root: "users".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    Pretty,
    /// JSON format.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
    /// Log output format.
    pub format: LogFormat,
    /// Include HTTP request/response logging.
    pub log_requests: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty, log_requests: true }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable metrics collection and the Prometheus endpoint.
    pub enabled: bool,
    /// Port for the metrics endpoint (separate from main server).
    pub port: u16,
    /// Bind address for metrics server.
    pub bind: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: false, port: 9198, bind: "127.0.0.1".to_string() }
    }
}
