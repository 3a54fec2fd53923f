//! Service configuration, loaded from environment variables.
//!
//! - `DATABASE_URL`: Postgres connection string
//! - `TABLEGATE_BIND`: listen address (default `0.0.0.0`)
//! - `PORT` or `TABLEGATE_PORT`: listen port (default 8000)
//! - `TABLEGATE_MAX_CONNECTIONS`: pool size (default 5)
//! - `TABLEGATE_SCHEMA`: schema holding managed tables (default `public`)
//! - `TABLEGATE_ROLE_ASSIGNMENTS`: extra `user=roleN` pairs, comma-separated
//! - `TABLEGATE_CORS_ORIGINS`: allowed origins, comma-separated (empty = any)

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::access::RoleDirectory;
use crate::ident::{Ident, IdentError};

const DEFAULT_DATABASE_URL: &str = "postgres://postgres@localhost:5432/new_db";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
    #[error("invalid TABLEGATE_SCHEMA: {0}")]
    Schema(#[from] IdentError),
    #[error("invalid TABLEGATE_ROLE_ASSIGNMENTS: {0}")]
    Roles(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub schema: Ident,
    pub roles: RoleDirectory,
    pub cors_origins: Vec<HeaderValue>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; `from_env` passes the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let host = lookup("TABLEGATE_BIND").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PORT").or_else(|| lookup("TABLEGATE_PORT")) {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                var: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };
        let addr = format!("{host}:{port}");
        let bind_addr = addr
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                var: "TABLEGATE_BIND",
                value: addr,
            })?;

        let max_connections = match lookup("TABLEGATE_MAX_CONNECTIONS") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "TABLEGATE_MAX_CONNECTIONS",
                        value: raw,
                    });
                }
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let schema = Ident::parse(&lookup("TABLEGATE_SCHEMA").unwrap_or_else(|| "public".into()))?;

        let roles = match lookup("TABLEGATE_ROLE_ASSIGNMENTS") {
            Some(raw) => RoleDirectory::parse(&raw).map_err(|e| ConfigError::Roles(e.to_string()))?,
            None => RoleDirectory::default(),
        };

        let cors_origins = match lookup("TABLEGATE_CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(|o| {
                    HeaderValue::from_str(o).map_err(|_| ConfigError::InvalidValue {
                        var: "TABLEGATE_CORS_ORIGINS",
                        value: o.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            database_url,
            bind_addr,
            max_connections,
            schema,
            roles,
            cors_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.schema.as_str(), "public");
        assert_eq!(config.roles.role_of("role2"), Some(Role::Reader));
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn port_prefers_plain_port_var() {
        let config = config_from(&[("PORT", "9000"), ("TABLEGATE_PORT", "9100")]).unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        let config = config_from(&[("TABLEGATE_PORT", "9100")]).unwrap();
        assert_eq!(config.bind_addr.port(), 9100);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("TABLEGATE_SCHEMA", "staging"),
            ("TABLEGATE_ROLE_ASSIGNMENTS", "alice=role3"),
            ("TABLEGATE_CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("TABLEGATE_MAX_CONNECTIONS", "12"),
        ])
        .unwrap();
        assert_eq!(config.schema.as_str(), "staging");
        assert_eq!(config.roles.role_of("alice"), Some(Role::Updater));
        let origins: Vec<&str> = config
            .cors_origins
            .iter()
            .map(|o| o.to_str().unwrap())
            .collect();
        assert_eq!(origins, ["http://a.test", "http://b.test"]);
        assert_eq!(config.max_connections, 12);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config_from(&[("PORT", "eighty")]),
            Err(ConfigError::InvalidValue { var: "PORT", .. })
        ));
        assert!(matches!(
            config_from(&[("TABLEGATE_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config_from(&[("TABLEGATE_SCHEMA", "bad-schema")]),
            Err(ConfigError::Schema(_))
        ));
        assert!(matches!(
            config_from(&[("TABLEGATE_ROLE_ASSIGNMENTS", "alice=root")]),
            Err(ConfigError::Roles(_))
        ));
    }

    #[test]
    fn unparseable_cors_origin_is_an_error() {
        let err = config_from(&[("TABLEGATE_CORS_ORIGINS", "http://ok.test,http://bad\n.test")])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { var: "TABLEGATE_CORS_ORIGINS", ref value }
                if value == "http://bad\n.test"
        ));
    }
}
