//! Service configuration loaded from environment variables.
//!
//! ## Required
//! - `ADMIN_API_TOKEN` - bearer token for `/api/admin/*`
//!
//! ## Optional
//! - `DATABASE_URL` - Postgres connection string; unset runs on the in-memory store
//! - `DATABASE_MAX_CONNECTIONS` (default: 10)
//! - `HOST` (default: 0.0.0.0), `PORT` (default: 8083)
//! - `NATS_URL` - enables publishing order events
//! - `NATS_SUBJECT_PREFIX` (default: storefront.orders)
//! - `ORDER_NUMBER_PREFIX` (default: ORD)
//! - `LOW_STOCK_THRESHOLD` (default: 5)
//! - `STRICT_STATUS_TRANSITIONS` (default: false)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub host: IpAddr,
    pub port: u16,
    pub nats_url: Option<String>,
    pub nats_subject_prefix: String,
    pub admin_token: String,
    pub order_number_prefix: String,
    pub low_stock_threshold: i32,
    pub strict_status_transitions: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("database_max_connections", &self.database_max_connections)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("nats_url", &self.nats_url)
            .field("nats_subject_prefix", &self.nats_subject_prefix)
            .field("admin_token", &"[REDACTED]")
            .field("order_number_prefix", &self.order_number_prefix)
            .field("low_stock_threshold", &self.low_stock_threshold)
            .field("strict_status_transitions", &self.strict_status_transitions)
            .finish()
    }
}

impl AppConfig {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let admin_token = get("ADMIN_API_TOKEN").ok_or(ConfigError::MissingEnvVar("ADMIN_API_TOKEN"))?;

        Ok(Self {
            database_url: get("DATABASE_URL"),
            database_max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            host: parse_or(&get, "HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or(&get, "PORT", 8083)?,
            nats_url: get("NATS_URL"),
            nats_subject_prefix: get("NATS_SUBJECT_PREFIX").unwrap_or_else(|| "storefront.orders".to_string()),
            admin_token,
            order_number_prefix: get("ORDER_NUMBER_PREFIX").unwrap_or_else(|| "ORD".to_string()),
            low_stock_threshold: parse_or(&get, "LOW_STOCK_THRESHOLD", 5)?,
            strict_status_transitions: parse_or(&get, "STRICT_STATUS_TRANSITIONS", false)?,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key, e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("ADMIN_API_TOKEN", "t0ken")]).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8083");
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.nats_subject_prefix, "storefront.orders");
        assert_eq!(config.order_number_prefix, "ORD");
        assert_eq!(config.low_stock_threshold, 5);
        assert!(!config.strict_status_transitions);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("ADMIN_API_TOKEN", "t0ken"),
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("PORT", "9000"),
            ("HOST", "127.0.0.1"),
            ("STRICT_STATUS_TRANSITIONS", "true"),
            ("ORDER_NUMBER_PREFIX", "SHOP"),
        ]).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/shop"));
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:9000");
        assert!(config.strict_status_transitions);
        assert_eq!(config.order_number_prefix, "SHOP");
    }

    #[test]
    fn test_errors() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::MissingEnvVar("ADMIN_API_TOKEN"));
        assert_eq!(load(&[("ADMIN_API_TOKEN", "  ")]).unwrap_err(), ConfigError::MissingEnvVar("ADMIN_API_TOKEN"));
        assert!(matches!(
            load(&[("ADMIN_API_TOKEN", "t"), ("PORT", "eighty")]),
            Err(ConfigError::InvalidEnvVar("PORT", _))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[("ADMIN_API_TOKEN", "hunter2"), ("DATABASE_URL", "postgres://u:pw@db/x")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("pw@db"));
    }
}
