// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the [`AppConfig`] loaded once at
//! startup. Missing required values are reported together so an operator can
//! fix them in one pass.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the custody database | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `ENCRYPTION_KEY` | 32-byte key encrypting private keys at rest | Required |
//! | `JWT_SECRET` | HS256 secret for bearer token verification | Required |
//! | `JWT_ISSUER` | Expected `iss` claim | Optional |
//! | `CHAIN_NETWORK` | `fuji` or `mainnet` | `fuji` |
//! | `CHAIN_RPC_URL` | RPC endpoint override | Network default |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; HTTPS when both are set | HTTP |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::blockchain::{network_from_name, NetworkConfig};
use crate::storage::paths::DATA_ROOT;

/// Directory holding the custody database.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Symmetric key for private-key encryption. Must be exactly 32 bytes of UTF-8.
pub const ENCRYPTION_KEY_ENV: &str = "ENCRYPTION_KEY";

/// HS256 shared secret used to verify bearer tokens.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

/// Expected token issuer. When unset the `iss` claim is not checked.
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";

pub const CHAIN_NETWORK_ENV: &str = "CHAIN_NETWORK";
pub const CHAIN_RPC_URL_ENV: &str = "CHAIN_RPC_URL";

pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

/// `json` for structured logs, anything else for human-readable output.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Fully resolved process configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub encryption_key: String,
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub network: NetworkConfig,
    pub rpc_url: Option<String>,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("data_dir", &self.data_dir)
            .field("bind_addr", &self.bind_addr)
            .field("encryption_key", &"<redacted>")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("network", &self.network.key)
            .field("rpc_url", &self.rpc_url)
            .field("tls", &self.tls)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let encryption_key = get(ENCRYPTION_KEY_ENV);
        if encryption_key.is_none() {
            missing.push(ENCRYPTION_KEY_ENV);
        }
        let jwt_secret = get(JWT_SECRET_ENV);
        if jwt_secret.is_none() {
            missing.push(JWT_SECRET_ENV);
        }
        let (Some(encryption_key), Some(jwt_secret)) = (encryption_key, jwt_secret) else {
            return Err(ConfigError::Missing(missing));
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(PORT_ENV) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: HOST_ENV,
                    reason: e.to_string(),
                })?;

        let network = network_from_name(get(CHAIN_NETWORK_ENV).as_deref()).map_err(|reason| {
            ConfigError::Invalid {
                name: CHAIN_NETWORK_ENV,
                reason,
            }
        })?;

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Invalid {
                    name: TLS_KEY_PATH_ENV,
                    reason: format!("required when {TLS_CERT_PATH_ENV} is set"),
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Invalid {
                    name: TLS_CERT_PATH_ENV,
                    reason: format!("required when {TLS_KEY_PATH_ENV} is set"),
                })
            }
        };

        Ok(Self {
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DATA_ROOT.to_string())),
            bind_addr,
            encryption_key,
            jwt_secret,
            jwt_issuer: get(JWT_ISSUER_ENV),
            network,
            rpc_url: get(CHAIN_RPC_URL_ENV),
            tls,
            log_format: LogFormat::parse(get(LOG_FORMAT_ENV).as_deref()),
        })
    }
}
