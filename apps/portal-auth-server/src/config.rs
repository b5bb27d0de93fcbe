// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the [`AppConfig`] loaded once at
//! startup. A missing required variable or an unparsable value aborts startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `AUTH_MODE` | Credential presentation (`bearer` or `cookie`) | `bearer` |
//! | `JWT_SECRET` | HS256 signing secret | Required |
//! | `JWT_AUDIENCE` | Expected `aud` claim (cookie mode) | Not validated |
//! | `ACCESS_TOKEN_TTL_SECS` | Access token lifetime | `1800` |
//! | `REFRESH_TOKEN_TTL_SECS` | Refresh token lifetime | `604800` |
//! | `SESSION_COOKIE_NAME` | Session cookie name | `elearning_session` |
//! | `SESSION_COOKIE_SECURE` | Add `Secure` to the session cookie | `true` |
//! | `SESSION_IDLE_TIMEOUT_SECS` | Session idle lifetime | `3600` |
//! | `SESSION_CAPACITY` | Maximum live sessions | `10000` |
//! | `SUPABASE_URL` | Hosted Supabase project URL | Required |
//! | `SUPABASE_SERVICE_ROLE_KEY` | Service key for admin lookups | Required |
//! | `SUPABASE_ANON_KEY` | Key for auth endpoints | Service key |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::auth::codec::{DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL};
use crate::auth::session::{DEFAULT_CAPACITY, DEFAULT_IDLE_TIMEOUT};
use crate::auth::AuthMode;
use crate::logging::LogFormat;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const AUTH_MODE_ENV: &str = "AUTH_MODE";

/// HS256 secret. In cookie mode this must be the identity provider's JWT
/// secret, since session access credentials are issued by the provider.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_AUDIENCE_ENV: &str = "JWT_AUDIENCE";
pub const ACCESS_TOKEN_TTL_ENV: &str = "ACCESS_TOKEN_TTL_SECS";
pub const REFRESH_TOKEN_TTL_ENV: &str = "REFRESH_TOKEN_TTL_SECS";
pub const SESSION_COOKIE_NAME_ENV: &str = "SESSION_COOKIE_NAME";
pub const SESSION_COOKIE_SECURE_ENV: &str = "SESSION_COOKIE_SECURE";
pub const SESSION_IDLE_TIMEOUT_ENV: &str = "SESSION_IDLE_TIMEOUT_SECS";
pub const SESSION_CAPACITY_ENV: &str = "SESSION_CAPACITY";
pub const SUPABASE_URL_ENV: &str = "SUPABASE_URL";
pub const SUPABASE_SERVICE_ROLE_KEY_ENV: &str = "SUPABASE_SERVICE_ROLE_KEY";
pub const SUPABASE_ANON_KEY_ENV: &str = "SUPABASE_ANON_KEY";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_COOKIE_NAME: &str = "elearning_session";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Process configuration, loaded once at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub auth_mode: AuthMode,
    pub jwt_secret: String,
    pub jwt_audience: Option<String>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub session_idle_timeout: Duration,
    pub session_capacity: usize,
    pub supabase_url: Url,
    pub supabase_service_role_key: String,
    pub supabase_anon_key: Option<String>,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let auth_mode = match env_optional(&lookup, AUTH_MODE_ENV) {
            Some(value) => AuthMode::parse(&value).ok_or(ConfigError::Invalid {
                name: AUTH_MODE_ENV,
                value,
            })?,
            None => AuthMode::Bearer,
        };

        let log_format = match env_optional(&lookup, LOG_FORMAT_ENV) {
            Some(value) => LogFormat::parse(&value).ok_or(ConfigError::Invalid {
                name: LOG_FORMAT_ENV,
                value,
            })?,
            None => LogFormat::Pretty,
        };

        let supabase_url = env_required(&lookup, SUPABASE_URL_ENV)?;
        let supabase_url = Url::parse(&supabase_url).map_err(|_| ConfigError::Invalid {
            name: SUPABASE_URL_ENV,
            value: supabase_url.clone(),
        })?;

        Ok(Self {
            host: env_optional(&lookup, HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: env_parsed(&lookup, PORT_ENV, DEFAULT_PORT)?,
            auth_mode,
            jwt_secret: env_required(&lookup, JWT_SECRET_ENV)?,
            jwt_audience: env_optional(&lookup, JWT_AUDIENCE_ENV),
            access_ttl: Duration::from_secs(env_parsed(
                &lookup,
                ACCESS_TOKEN_TTL_ENV,
                DEFAULT_ACCESS_TTL.as_secs(),
            )?),
            refresh_ttl: Duration::from_secs(env_parsed(
                &lookup,
                REFRESH_TOKEN_TTL_ENV,
                DEFAULT_REFRESH_TTL.as_secs(),
            )?),
            cookie_name: env_optional(&lookup, SESSION_COOKIE_NAME_ENV)
                .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string()),
            cookie_secure: env_bool(&lookup, SESSION_COOKIE_SECURE_ENV, true)?,
            session_idle_timeout: Duration::from_secs(env_parsed(
                &lookup,
                SESSION_IDLE_TIMEOUT_ENV,
                DEFAULT_IDLE_TIMEOUT.as_secs(),
            )?),
            session_capacity: env_parsed(&lookup, SESSION_CAPACITY_ENV, DEFAULT_CAPACITY)?,
            supabase_url,
            supabase_service_role_key: env_required(&lookup, SUPABASE_SERVICE_ROLE_KEY_ENV)?,
            supabase_anon_key: env_optional(&lookup, SUPABASE_ANON_KEY_ENV),
            log_format,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::Invalid {
            name: HOST_ENV,
            value: addr,
        })
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("auth_mode", &self.auth_mode)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_audience", &self.jwt_audience)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("cookie_name", &self.cookie_name)
            .field("cookie_secure", &self.cookie_secure)
            .field("session_idle_timeout", &self.session_idle_timeout)
            .field("session_capacity", &self.session_capacity)
            .field("supabase_url", &self.supabase_url.as_str())
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

fn env_optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    env_optional(lookup, name).ok_or(ConfigError::Missing(name))
}

fn env_parsed<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match env_optional(lookup, name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn env_bool<F>(lookup: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match env_optional(lookup, name) {
        Some(value) => match value.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        (JWT_SECRET_ENV, "secret"),
        (SUPABASE_URL_ENV, "https://project.supabase.co"),
        (SUPABASE_SERVICE_ROLE_KEY_ENV, "service-key"),
    ];

    #[test]
    fn defaults_apply() {
        let config = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.auth_mode, AuthMode::Bearer);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.access_ttl, Duration::from_secs(1800));
        assert_eq!(config.refresh_ttl, Duration::from_secs(604_800));
        assert_eq!(config.cookie_name, DEFAULT_COOKIE_NAME);
        assert!(config.cookie_secure);
        assert_eq!(config.session_idle_timeout, Duration::from_secs(3600));
        assert_eq!(config.session_capacity, 10_000);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.bind_addr().unwrap().port(), 8080);
    }

    #[test]
    fn missing_secret_is_rejected() {
        let result = AppConfig::from_lookup(lookup(&REQUIRED[1..]));
        assert_eq!(result.err(), Some(ConfigError::Missing(JWT_SECRET_ENV)));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut vars = REQUIRED.to_vec();
        vars[2] = (SUPABASE_SERVICE_ROLE_KEY_ENV, "   ");
        let result = AppConfig::from_lookup(lookup(&vars));
        assert_eq!(result.err(), Some(ConfigError::Missing(SUPABASE_SERVICE_ROLE_KEY_ENV)));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            (AUTH_MODE_ENV, "cookie"),
            (SESSION_COOKIE_SECURE_ENV, "false"),
            (SESSION_IDLE_TIMEOUT_ENV, "600"),
            (LOG_FORMAT_ENV, "json"),
            (PORT_ENV, "9000"),
        ]);
        let config = AppConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.auth_mode, AuthMode::CookieSession);
        assert!(!config.cookie_secure);
        assert_eq!(config.session_idle_timeout, Duration::from_secs(600));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push((AUTH_MODE_ENV, "kerberos"));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid { name: AUTH_MODE_ENV, .. })
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push((PORT_ENV, "eighty"));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid { name: PORT_ENV, .. })
        ));

        let mut vars = REQUIRED.to_vec();
        vars[1] = (SUPABASE_URL_ENV, "not a url");
        assert!(matches!(
            AppConfig::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid { name: SUPABASE_URL_ENV, .. })
        ));
    }

    #[test]
    fn debug_redacts_secret() {
        let config = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("\"secret\""));
        assert!(!rendered.contains("service-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
