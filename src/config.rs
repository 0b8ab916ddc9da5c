// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup. Empty
//! variables count as unset.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding `parcel-locker.redb` | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `5000` |
//! | `AUTH_MODE` | `session` (cookie) or `token` (bearer JWT) | `session` |
//! | `SESSION_NAME` | Session cookie name | `session` |
//! | `SECURE_COOKIE` | Anything but `FALSE` sets the `Secure` flag | `FALSE` |
//! | `SESSION_MAX_AGE_SECS` | Session lifetime | `86400` |
//! | `JWT_SECRET` | Shared HMAC secret | Required in `token` mode |
//! | `JWT_TTL_SECS` | Lifetime of issued tokens | `3600` |
//! | `ALLOWED_ORIGINS` | Comma separated CORS origins | none |
//! | `STORE_TIMEOUT_MS` | Per-operation store timeout | `2000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const AUTH_MODE_ENV: &str = "AUTH_MODE";
pub const SESSION_NAME_ENV: &str = "SESSION_NAME";
pub const SECURE_COOKIE_ENV: &str = "SECURE_COOKIE";
pub const SESSION_MAX_AGE_ENV: &str = "SESSION_MAX_AGE_SECS";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_TTL_ENV: &str = "JWT_TTL_SECS";
pub const ALLOWED_ORIGINS_ENV: &str = "ALLOWED_ORIGINS";
pub const STORE_TIMEOUT_ENV: &str = "STORE_TIMEOUT_MS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_SESSION_NAME: &str = "session";
/// One day.
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24;
pub const DEFAULT_JWT_TTL_SECS: u64 = 3600;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is required when AUTH_MODE=token")]
    Missing { var: &'static str },

    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

// =============================================================================
// Modes
// =============================================================================

/// Which auth gate protects the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Cookie sessions backed by the store
    Session,
    /// Stateless bearer tokens
    Token,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "session" => Ok(AuthMode::Session),
            "token" | "jwt" => Ok(AuthMode::Token),
            _ => Err("expected `session` or `token`".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err("expected `json` or `pretty`".to_string()),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    pub auth_mode: AuthMode,
    pub session_name: String,
    pub secure_cookie: bool,
    pub session_max_age: Duration,
    /// Present whenever `auth_mode` is `Token`.
    pub jwt_secret: Option<String>,
    pub jwt_ttl: Duration,
    pub allowed_origins: Vec<String>,
    pub store_timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            auth_mode: AuthMode::Session,
            session_name: DEFAULT_SESSION_NAME.to_string(),
            secure_cookie: false,
            session_max_age: Duration::from_secs(DEFAULT_SESSION_MAX_AGE_SECS),
            jwt_secret: None,
            jwt_ttl: Duration::from_secs(DEFAULT_JWT_TTL_SECS),
            allowed_origins: Vec::new(),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let auth_mode = parse_or(&get, AUTH_MODE_ENV, defaults.auth_mode)?;
        let jwt_secret = get(JWT_SECRET_ENV);
        if auth_mode == AuthMode::Token && jwt_secret.is_none() {
            return Err(ConfigError::Missing { var: JWT_SECRET_ENV });
        }

        let secure_cookie = get(SECURE_COOKIE_ENV).is_some_and(|value| value != "FALSE");

        let allowed_origins = get(ALLOWED_ORIGINS_ENV)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from).unwrap_or(defaults.data_dir),
            host: parse_or(&get, HOST_ENV, defaults.host)?,
            port: parse_or(&get, PORT_ENV, defaults.port)?,
            auth_mode,
            session_name: get(SESSION_NAME_ENV).unwrap_or(defaults.session_name),
            secure_cookie,
            session_max_age: Duration::from_secs(parse_or(
                &get,
                SESSION_MAX_AGE_ENV,
                DEFAULT_SESSION_MAX_AGE_SECS,
            )?),
            jwt_secret,
            jwt_ttl: Duration::from_secs(parse_or(&get, JWT_TTL_ENV, DEFAULT_JWT_TTL_SECS)?),
            allowed_origins,
            store_timeout: Duration::from_millis(parse_or(
                &get,
                STORE_TIMEOUT_ENV,
                DEFAULT_STORE_TIMEOUT_MS,
            )?),
            log_format: parse_or(&get, LOG_FORMAT_ENV, defaults.log_format)?,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
