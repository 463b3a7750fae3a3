//! Configuration loader for the `plantation-api` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Nothing else in the crate reads `env::var` for
//! application settings.
//!
use std::{env, path::PathBuf};

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional port environment variable with a default value.
macro_rules! parse_env_u16 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u16>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable, treating blank values as unset.
macro_rules! optional_env {
    ($var_name:expr) => {
        env::var($var_name).ok().filter(|v| !v.trim().is_empty())
    };
}

pub const DEFAULT_DATABASE_URL: &str = "sqlite://plantation.db?mode=rwc";
pub const DEFAULT_MAP_OUTPUT_PATH: &str = "static/getmap.html";

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// SQLite connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Port the HTTP server binds on all interfaces.
    pub bind_port: u16,

    /// Where `/getmap` persists the rendered map page.
    pub map_output_path: PathBuf,

    /// Base URL advertised on the `/apis` reference page.
    pub public_base_url: String,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `DATABASE_URL` – SQLite connection string (default: `sqlite://plantation.db?mode=rwc`)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `BIND_PORT` – HTTP port (default: 5000)
/// - `MAP_OUTPUT_PATH` – persisted map page (default: `static/getmap.html`)
/// - `PUBLIC_BASE_URL` – base URL for `/apis` (default: `http://127.0.0.1:{BIND_PORT}`)
///
/// Returns an error if any numeric variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = optional_env!("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);
    let bind_port = parse_env_u16!("BIND_PORT", 5000);
    let map_output_path = optional_env!("MAP_OUTPUT_PATH")
        .unwrap_or_else(|| DEFAULT_MAP_OUTPUT_PATH.into())
        .into();
    let public_base_url = optional_env!("PUBLIC_BASE_URL")
        .unwrap_or_else(|| format!("http://127.0.0.1:{bind_port}"));

    if db_pool_max == 0 {
        return Err(anyhow!("DB_POOL_MAX must be at least 1"));
    }

    Ok(Config {
        db_url,
        db_pool_max,
        bind_port,
        map_output_path,
        public_base_url: public_base_url.trim_end_matches('/').to_string(),
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL    : {}", self.db_url);
        tracing::info!("  DB_POOL_MAX     : {}", self.db_pool_max);
        tracing::info!("  BIND_PORT       : {}", self.bind_port);
        tracing::info!("  MAP_OUTPUT_PATH : {}", self.map_output_path.display());
        tracing::info!("  PUBLIC_BASE_URL : {}", self.public_base_url);
    }
}

#[cfg(test)]
impl Config {
    /// Configuration used by route tests; never touches the environment.
    pub fn for_tests(map_output_path: PathBuf) -> Self {
        // ---
        Config {
            db_url: "sqlite::memory:".into(),
            db_pool_max: 1,
            bind_port: 5000,
            map_output_path,
            public_base_url: "http://127.0.0.1:5000".into(),
        }
    }
}
