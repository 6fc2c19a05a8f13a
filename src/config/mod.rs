//! Typed configuration from environment variables.
//!
//! Loads once at startup. `DATABASE_URL` is deliberately not part of this:
//! [`crate::db::ClientProvider`] reads it on first use, and its absence is
//! reported by the health probe rather than refusing to start.

pub mod secrets;

use crate::error::{Error, Result};
use std::net::SocketAddr;

/// Environment name assumed when `NODE_ENV` is unset.
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Table checked by the health probe when `HEALTH_TABLES` is unset.
pub const DEFAULT_HEALTH_TABLE: &str = "users";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug)]
pub struct Config {
    pub environment: String,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    pub health_tables: Vec<String>,
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let bind_addr = optional_var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| Error::Configuration(format!("invalid BIND_ADDR: {e}")))?;

        Ok(Self {
            environment: optional_var("NODE_ENV")
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            otel_endpoint: optional_var("OTEL_ENDPOINT"),
            log_level: optional_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            health_tables: optional_var("HEALTH_TABLES")
                .map(|raw| parse_table_list(&raw))
                .unwrap_or_else(|| vec![DEFAULT_HEALTH_TABLE.to_string()]),
            bind_addr,
        })
    }

    /// Whether verbose database logging is enabled.
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

/// Split a comma-separated table list, dropping blanks.
pub fn parse_table_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
