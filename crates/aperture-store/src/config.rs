use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::error::StoreError;

/// Runtime environment, read from `APP_ENV`. Anything other than
/// `production` is treated as development.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV") {
            Ok(v) if v.eq_ignore_ascii_case("production") => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

impl std::fmt::Display for AppEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// TLS policy for PostgreSQL connections.
///
/// Verification is only relaxed when explicitly requested; the default
/// verifies the server certificate and hostname.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SslPolicy {
    /// No TLS at all (`DISABLE_POSTGRES_SSL`).
    Disabled,
    /// TLS without certificate verification, for self-signed certs
    /// (`POSTGRES_ACCEPT_INVALID_CERTS`).
    AcceptInvalid,
    /// Full certificate and hostname verification.
    VerifyFull,
}

impl SslPolicy {
    fn ssl_mode(self) -> PgSslMode {
        match self {
            Self::Disabled => PgSslMode::Disable,
            Self::AcceptInvalid => PgSslMode::Require,
            Self::VerifyFull => PgSslMode::VerifyFull,
        }
    }
}

/// Database configuration, sourced from the environment.
///
/// `POSTGRES_URL` feeds the shared pool; `POSTGRES_URL_NON_POOLING`, when
/// present, feeds the dedicated connections used for transactions (pooled
/// and direct network paths may differ behind a connection proxy).
#[derive(Clone, Debug)]
pub struct DbConfig {
    pub url: String,
    pub direct_url: String,
    pub ssl: SslPolicy,
    pub env: AppEnv,
}

impl DbConfig {
    /// Load from process environment variables.
    ///
    /// Returns `Ok(None)` when `POSTGRES_URL` is unset: the service can
    /// run without a database, reporting `not_configured` from the health
    /// probe.
    pub fn from_env() -> Result<Option<Self>, StoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (injectable for tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, StoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = match lookup("POSTGRES_URL").filter(|v| !v.is_empty()) {
            Some(url) => url,
            None => return Ok(None),
        };

        let direct_url = lookup("POSTGRES_URL_NON_POOLING")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| url.clone());

        let ssl = if flag(lookup("DISABLE_POSTGRES_SSL")) {
            SslPolicy::Disabled
        } else if flag(lookup("POSTGRES_ACCEPT_INVALID_CERTS")) {
            SslPolicy::AcceptInvalid
        } else {
            SslPolicy::VerifyFull
        };

        let env = match lookup("APP_ENV") {
            Some(v) if v.eq_ignore_ascii_case("production") => AppEnv::Production,
            _ => AppEnv::Development,
        };

        Ok(Some(Self {
            url,
            direct_url,
            ssl,
            env,
        }))
    }

    /// Connect options for the shared pool.
    pub fn connect_options(&self) -> Result<PgConnectOptions, StoreError> {
        parse_options(&self.url, self.ssl)
    }

    /// Connect options for dedicated (transactional) connections.
    pub fn direct_connect_options(&self) -> Result<PgConnectOptions, StoreError> {
        parse_options(&self.direct_url, self.ssl)
    }
}

fn parse_options(url: &str, ssl: SslPolicy) -> Result<PgConnectOptions, StoreError> {
    let opts: PgConnectOptions = url
        .parse()
        .map_err(|e| StoreError::Config(format!("invalid connection string: {e}")))?;
    Ok(opts.ssl_mode(ssl.ssl_mode()))
}

/// Interpret an env var as a boolean switch: set, non-empty, and not
/// `0`/`false`.
fn flag(value: Option<String>) -> bool {
    match value {
        Some(v) => !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"),
        None => false,
    }
}
