//! Runtime settings, read from `GATEWAY_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub const HTTP_ADDR_VAR: &str = "GATEWAY_HTTP_ADDR";
pub const SOCKET_ADDR_VAR: &str = "GATEWAY_SOCKET_ADDR";
pub const BACKEND_ADDR_VAR: &str = "GATEWAY_BACKEND_ADDR";
pub const CREDENTIALS_VAR: &str = "GATEWAY_CREDENTIALS";
pub const FRAME_LIMIT_VAR: &str = "GATEWAY_FRAME_LIMIT";
pub const ROSTER_DEBUG_VAR: &str = "GATEWAY_ROSTER_DEBUG";

/// Default WebSocket frame limit, in bytes.
pub const DEFAULT_FRAME_LIMIT: usize = 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}={value:?} is invalid: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("cannot load credentials from {path}: {source}")]
    Credentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listener for WebSocket clients and the status endpoint.
    pub http_addr: SocketAddr,
    /// Optional listener for raw socket clients.
    pub socket_addr: Option<SocketAddr>,
    /// Authoritative game backend.
    pub backend_addr: SocketAddr,
    /// JSON file of login records.
    pub credentials_path: Option<PathBuf>,
    /// Largest accepted frame, on WebSocket and TCP connections alike.
    pub frame_limit: usize,
    /// Value of the `debug` field in the commit-time roster.
    pub roster_debug: u8,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            socket_addr: None,
            backend_addr: SocketAddr::from(([127, 0, 0, 1], 5269)),
            credentials_path: None,
            frame_limit: DEFAULT_FRAME_LIMIT,
            roster_debug: 0,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset keys keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            http_addr: parse_or(get(HTTP_ADDR_VAR), HTTP_ADDR_VAR, defaults.http_addr)?,
            socket_addr: get(SOCKET_ADDR_VAR)
                .map(|value| parse(&value, SOCKET_ADDR_VAR))
                .transpose()?,
            backend_addr: parse_or(get(BACKEND_ADDR_VAR), BACKEND_ADDR_VAR, defaults.backend_addr)?,
            credentials_path: get(CREDENTIALS_VAR).map(PathBuf::from),
            frame_limit: parse_or(get(FRAME_LIMIT_VAR), FRAME_LIMIT_VAR, defaults.frame_limit)?,
            roster_debug: parse_or(get(ROSTER_DEBUG_VAR), ROSTER_DEBUG_VAR, defaults.roster_debug)?,
        })
    }
}

fn parse<T>(value: &str, key: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<T>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => parse(&value, key),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GatewayConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.http_addr.port(), 8080);
        assert_eq!(config.backend_addr.to_string(), "127.0.0.1:5269");
        assert!(config.socket_addr.is_none());
        assert!(config.credentials_path.is_none());
        assert_eq!(config.frame_limit, DEFAULT_FRAME_LIMIT);
        assert_eq!(config.roster_debug, 0);
    }

    #[test]
    fn variables_override_defaults() {
        let config = config_from(&[
            (HTTP_ADDR_VAR, "0.0.0.0:9000"),
            (SOCKET_ADDR_VAR, "0.0.0.0:9001"),
            (BACKEND_ADDR_VAR, "10.0.0.5:7000"),
            (CREDENTIALS_VAR, "/etc/gateway/tokens.json"),
            (FRAME_LIMIT_VAR, "4096"),
            (ROSTER_DEBUG_VAR, "1"),
        ])
        .unwrap();
        assert_eq!(config.http_addr.port(), 9000);
        assert_eq!(config.socket_addr.map(|a| a.port()), Some(9001));
        assert_eq!(config.backend_addr.to_string(), "10.0.0.5:7000");
        assert_eq!(
            config.credentials_path,
            Some(PathBuf::from("/etc/gateway/tokens.json"))
        );
        assert_eq!(config.frame_limit, 4096);
        assert_eq!(config.roster_debug, 1);
    }

    #[test]
    fn blank_variable_keeps_default() {
        let config = config_from(&[(SOCKET_ADDR_VAR, "  ")]).unwrap();
        assert!(config.socket_addr.is_none());
    }

    #[test]
    fn invalid_value_names_the_variable() {
        let err = config_from(&[(BACKEND_ADDR_VAR, "not-an-address")]).unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, BACKEND_ADDR_VAR);
                assert_eq!(value, "not-an-address");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
