//! Application configuration parsed from environment variables.
//!
//! Startup loads `.env` (if present) before calling [`AppConfig::from_env`].
//! Only `DATABASE_URL` is required; every tuning knob falls back to a default
//! when absent or unparsable.

use std::time::Duration;

use crate::retry::RetryPolicy;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 168;
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;
pub const DEFAULT_RETRY_MULTIPLIER: u32 = 2;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub cookie_secure: bool,
    pub session_ttl_hours: i64,
    pub retry: RetryPolicy,
    /// First admin account, created at startup only while no admin exists.
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`
    ///
    /// Optional:
    /// - `PORT` (default 3000, must parse)
    /// - `DB_MAX_CONNECTIONS` (default 5)
    /// - `COOKIE_SECURE` (default false)
    /// - `SESSION_TTL_HOURS` (default 168)
    /// - `RETRY_MAX_ATTEMPTS`, `RETRY_BASE_DELAY_MS`, `RETRY_MULTIPLIER`, `RETRY_MAX_DELAY_MS`
    /// - `BOOTSTRAP_ADMIN_EMAIL` + `BOOTSTRAP_ADMIN_PASSWORD` (both or neither)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `DATABASE_URL` is unset or blank and
    /// [`ConfigError::Invalid`] when `PORT` is set but not a port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value: raw })?,
            Err(_) => DEFAULT_PORT,
        };

        let retry = RetryPolicy {
            max_attempts: env_parse("RETRY_MAX_ATTEMPTS", DEFAULT_RETRY_MAX_ATTEMPTS).max(1),
            base_delay: Duration::from_millis(env_parse("RETRY_BASE_DELAY_MS", DEFAULT_RETRY_BASE_DELAY_MS)),
            multiplier: env_parse("RETRY_MULTIPLIER", DEFAULT_RETRY_MULTIPLIER).max(1),
            max_delay: Duration::from_millis(env_parse("RETRY_MAX_DELAY_MS", DEFAULT_RETRY_MAX_DELAY_MS)),
        };

        Ok(Self {
            database_url,
            port,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(false),
            session_ttl_hours: env_parse("SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS).max(1),
            retry,
            bootstrap_admin: bootstrap_admin_from_env(),
        })
    }
}

fn bootstrap_admin_from_env() -> Option<BootstrapAdmin> {
    let email = env_non_blank("BOOTSTRAP_ADMIN_EMAIL")?;
    let password = env_non_blank("BOOTSTRAP_ADMIN_PASSWORD")?;
    Some(BootstrapAdmin { email, password })
}

fn env_non_blank(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| parse_bool(&raw))
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
