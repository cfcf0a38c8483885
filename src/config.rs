//! Runtime configuration for the sandbox server.
//!
//! A plain struct with working defaults; a TOML file fills in overrides and
//! the CLI layer applies flag/environment overrides on top.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SandboxError};

/// Server, pool, and feature settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Interface the HTTP server binds to.
    pub host: IpAddr,
    /// Listening port.
    pub port: u16,
    /// PostgreSQL connection string for the sandbox database.
    pub database_url: String,
    /// Maximum concurrent pooled connections.
    pub pool_max_connections: u32,
    /// How long an execution may wait for a free connection, in milliseconds.
    pub pool_acquire_timeout_ms: u64,
    /// Idle connection reap threshold, in milliseconds.
    pub pool_idle_timeout_ms: u64,
    /// Server-side statement execution ceiling, in milliseconds.
    pub statement_timeout_ms: u64,
    /// Allowed CORS origins for browser clients. Empty disables CORS.
    pub allow_origins: Vec<String>,
    /// Assignment seed file (TOML). `None` serves an empty catalog.
    pub assignments_path: Option<PathBuf>,
    /// Bound on retained attempt records.
    pub attempt_log_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
            database_url: "postgres://localhost:5432/sqlpen".to_string(),
            pool_max_connections: 20,
            pool_acquire_timeout_ms: 2_000,
            pool_idle_timeout_ms: 30_000,
            statement_timeout_ms: 5_000,
            allow_origins: Vec::new(),
            assignments_path: None,
            attempt_log_capacity: 1_000,
        }
    }
}

impl Config {
    /// Loads settings from a TOML file; keys absent from the file keep their
    /// defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|err| SandboxError::Config(err.to_string()))
    }

    /// Conventional per-user config file location, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sqlpen").join("config.toml"))
    }
}
