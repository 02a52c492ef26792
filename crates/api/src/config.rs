//! Application configuration loaded from environment variables.

use common::{Identity, ParseIdentityError};
use registry::{DEFAULT_REGISTRY_NAME, DEFAULT_SNAPSHOT_INTERVAL};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is not a valid identity: {source}")]
    InvalidIdentity {
        var: &'static str,
        #[source]
        source: ParseIdentityError,
    },
}

/// Server configuration.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `REGISTRY_NAME`: display name used when the registry is first created
/// - `REGISTRY_ADMIN`: identity that administers a newly created registry (required)
/// - `DATABASE_URL`: PostgreSQL connection string; unset means in-memory
/// - `SNAPSHOT_INTERVAL`: records between snapshots, `0` disables (default: `50`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub registry_name: String,
    pub registry_admin: Identity,
    pub database_url: Option<String>,
    pub snapshot_interval: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// everything except the administrator.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let registry_admin = lookup("REGISTRY_ADMIN")
            .ok_or(ConfigError::Missing("REGISTRY_ADMIN"))?
            .trim()
            .parse::<Identity>()
            .map_err(|source| ConfigError::InvalidIdentity {
                var: "REGISTRY_ADMIN",
                source,
            })?;

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            registry_name: lookup("REGISTRY_NAME")
                .unwrap_or_else(|| DEFAULT_REGISTRY_NAME.to_string()),
            registry_admin,
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            snapshot_interval: lookup("SNAPSHOT_INTERVAL")
                .and_then(|n| n.parse().ok())
                .unwrap_or(DEFAULT_SNAPSHOT_INTERVAL),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const ADMIN: &str = "0x00000000000000000000000000000000000000aa";

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = load(&[("REGISTRY_ADMIN", ADMIN)]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.registry_name, "BhuChain Land Registry");
        assert_eq!(config.registry_admin, ADMIN.parse().unwrap());
        assert_eq!(config.database_url, None);
        assert_eq!(config.snapshot_interval, 50);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("REGISTRY_ADMIN", ADMIN),
            ("PORT", "8080"),
            ("REGISTRY_NAME", "Lalitpur Cadastre"),
            ("DATABASE_URL", "postgres://localhost/registry"),
            ("SNAPSHOT_INTERVAL", "0"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.registry_name, "Lalitpur Cadastre");
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/registry")
        );
        assert_eq!(config.snapshot_interval, 0);
    }

    #[test]
    fn test_unparseable_port_falls_back() {
        let config = load(&[("REGISTRY_ADMIN", ADMIN), ("PORT", "http")]).unwrap();
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_missing_admin() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("REGISTRY_ADMIN")));
    }

    #[test]
    fn test_malformed_admin() {
        let err = load(&[("REGISTRY_ADMIN", "0x1234")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIdentity { .. }));
    }

    #[test]
    fn test_empty_database_url_means_in_memory() {
        let config = load(&[("REGISTRY_ADMIN", ADMIN), ("DATABASE_URL", "")]).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_addr_formatting() {
        let mut config = load(&[("REGISTRY_ADMIN", ADMIN)]).unwrap();
        config.host = "127.0.0.1".to_string();
        config.port = 8080;
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
