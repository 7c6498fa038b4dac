use std::env;
use std::time::Duration;

use crate::constants::{DEFAULT_FETCH_TIMEOUT, DEFAULT_FRESH_TTL, DEFAULT_STALE_TTL};

/// Caller-facing configuration for the validator and its key provider.
///
/// `jwks_url`, `issuer`, and `audience` are all optional: without a JWKS
/// URL the provider must be preloaded, and issuer/audience checks are
/// skipped when no expectation is configured, which is the caller's
/// choice, not the validator's.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub audience: Vec<String>,
    pub fresh_ttl: Duration,
    pub stale_ttl: Duration,
    pub fetch_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwks_url: None,
            issuer: None,
            audience: Vec::new(),
            fresh_ttl: DEFAULT_FRESH_TTL,
            stale_ttl: DEFAULT_STALE_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl AuthConfig {
    /// Reads configuration from the environment.
    ///
    /// Recognized variables: `AUTH_JWKS_URL`, `AUTH_EXPECTED_ISSUER`,
    /// `AUTH_EXPECTED_AUDIENCE` (comma-separated),
    /// `AUTH_JWKS_FRESH_TTL_SECS`, `AUTH_JWKS_STALE_TTL_SECS`,
    /// `AUTH_JWKS_TIMEOUT_SECS`. Unset or unparseable values fall back to
    /// defaults with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.jwks_url = non_empty(env::var("AUTH_JWKS_URL").ok());
        config.issuer = non_empty(env::var("AUTH_EXPECTED_ISSUER").ok());
        if let Some(raw) = non_empty(env::var("AUTH_EXPECTED_AUDIENCE").ok()) {
            config.audience = raw
                .split(',')
                .map(str::trim)
                .filter(|aud| !aud.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(secs) = duration_var("AUTH_JWKS_FRESH_TTL_SECS") {
            config.fresh_ttl = secs;
        }
        if let Some(secs) = duration_var("AUTH_JWKS_STALE_TTL_SECS") {
            config.stale_ttl = secs;
        }
        if let Some(secs) = duration_var("AUTH_JWKS_TIMEOUT_SECS") {
            config.fetch_timeout = secs;
        }
        config
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn duration_var(name: &str) -> Option<Duration> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            log::warn!("ignoring unparseable {name}: {raw}");
            None
        }
    }
}
