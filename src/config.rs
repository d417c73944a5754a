//! Service configuration parsed from environment variables.
//!
//! SYSTEM CONTEXT
//! ==============
//! `main` loads `.env` (if present) and then calls [`AppConfig::from_env`]
//! once. Everything downstream receives the typed config through
//! `AppState` instead of reading the environment again.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_SESSION_TTL_DAYS: i32 = 30;

pub const DEFAULT_LOGIN_LIMIT: usize = 10;
pub const DEFAULT_LOGIN_WINDOW_SECS: u64 = 300;
pub const DEFAULT_RESET_LIMIT: usize = 3;
pub const DEFAULT_RESET_WINDOW_SECS: u64 = 900;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is required")]
    Missing { var: &'static str },
    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Resend credentials for outgoing mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailerConfig {
    pub api_key: String,
    pub from: String,
}

/// One sliding-window limit: at most `limit` events per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLimit {
    pub limit: usize,
    pub window: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub public_base_url: String,
    pub cookie_secure: bool,
    pub session_ttl_days: i32,
    pub mailer: Option<MailerConfig>,
    pub static_dir: Option<PathBuf>,
    pub login_limit: WindowLimit,
    pub reset_limit: WindowLimit,
}

impl AppConfig {
    /// Build typed config from the process environment.
    ///
    /// Required:
    /// - `DATABASE_URL`
    ///
    /// Optional:
    /// - `PORT` (3000), `DB_MAX_CONNECTIONS` (5)
    /// - `PUBLIC_BASE_URL` (`http://localhost:3000`), used in emailed links
    /// - `COOKIE_SECURE`: defaults to true when `PUBLIC_BASE_URL` is https
    /// - `SESSION_TTL_DAYS` (30)
    /// - `RESEND_API_KEY` + `RESEND_FROM`: both or neither
    /// - `STATIC_DIR`: front-end bundle served for unmatched paths
    /// - `RATE_LIMIT_LOGIN` / `RATE_LIMIT_LOGIN_WINDOW_SECS` (10 / 300)
    /// - `RATE_LIMIT_RESET` / `RATE_LIMIT_RESET_WINDOW_SECS` (3 / 900)
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Tests use this to avoid
    /// touching the process environment.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing { var: "DATABASE_URL" })?;

        let public_base_url = lookup("PUBLIC_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_owned());

        let cookie_secure = match lookup("COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid { var: "COOKIE_SECURE", value: raw })?,
            None => public_base_url.starts_with("https://"),
        };

        let mailer = match (lookup("RESEND_API_KEY"), lookup("RESEND_FROM")) {
            (Some(api_key), Some(from)) if !api_key.trim().is_empty() && !from.trim().is_empty() => {
                Some(MailerConfig { api_key, from })
            }
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing { var: "RESEND_FROM" }),
            (None, Some(_)) => return Err(ConfigError::Missing { var: "RESEND_API_KEY" }),
            (Some(api_key), Some(_)) => {
                let var = if api_key.trim().is_empty() { "RESEND_API_KEY" } else { "RESEND_FROM" };
                return Err(ConfigError::Invalid { var, value: "<blank>".into() });
            }
        };

        let session_ttl_days = parse_var(&lookup, "SESSION_TTL_DAYS", DEFAULT_SESSION_TTL_DAYS)?;
        if session_ttl_days <= 0 {
            return Err(ConfigError::Invalid { var: "SESSION_TTL_DAYS", value: session_ttl_days.to_string() });
        }

        Ok(Self {
            database_url,
            port: parse_var(&lookup, "PORT", DEFAULT_PORT)?,
            db_max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            public_base_url,
            cookie_secure,
            session_ttl_days,
            mailer,
            static_dir: lookup("STATIC_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            login_limit: WindowLimit {
                limit: parse_var(&lookup, "RATE_LIMIT_LOGIN", DEFAULT_LOGIN_LIMIT)?,
                window: Duration::from_secs(parse_var(
                    &lookup,
                    "RATE_LIMIT_LOGIN_WINDOW_SECS",
                    DEFAULT_LOGIN_WINDOW_SECS,
                )?),
            },
            reset_limit: WindowLimit {
                limit: parse_var(&lookup, "RATE_LIMIT_RESET", DEFAULT_RESET_LIMIT)?,
                window: Duration::from_secs(parse_var(
                    &lookup,
                    "RATE_LIMIT_RESET_WINDOW_SECS",
                    DEFAULT_RESET_WINDOW_SECS,
                )?),
            },
        })
    }

    /// Link emailed to users requesting a password reset.
    #[must_use]
    pub fn password_reset_url(&self, token: &str) -> String {
        format!("{}/reset-password?token={token}", self.public_base_url)
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
