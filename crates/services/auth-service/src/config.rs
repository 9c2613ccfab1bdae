//! Auth service configuration.

use std::fmt;

use chrono::Duration;

use common::{env_lookup, AppError, AppResult};
use domain::{DEFAULT_TOKEN_TTL_MINUTES, MIN_AUTH_SECRET_LENGTH};

/// Auth service configuration.
#[derive(Clone)]
pub struct AuthServiceConfig {
    /// Token signing secret (min 32 characters)
    pub auth_secret: String,
    /// Lifetime of issued tokens
    pub token_ttl: Duration,
    /// Secret mixed into every password hash
    pub hash_salt: Option<String>,
}

impl fmt::Debug for AuthServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthServiceConfig")
            .field("auth_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("hash_salt", &self.hash_salt.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl AuthServiceConfig {
    /// Load from `AUTH_SECRET`, `AUTH_TOKEN_TTL_SECONDS` / `AUTH_TOKEN_TTL_MINUTES`
    /// and `HASH_SALT`.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let auth_secret =
            lookup("AUTH_SECRET").ok_or_else(|| AppError::config("AUTH_SECRET is not set"))?;
        if auth_secret.len() < MIN_AUTH_SECRET_LENGTH {
            return Err(AppError::config(format!(
                "AUTH_SECRET must be at least {} characters",
                MIN_AUTH_SECRET_LENGTH
            )));
        }

        // Seconds take priority over minutes
        let token_ttl = match (
            lookup("AUTH_TOKEN_TTL_SECONDS"),
            lookup("AUTH_TOKEN_TTL_MINUTES"),
        ) {
            (Some(seconds), _) => Duration::seconds(positive("AUTH_TOKEN_TTL_SECONDS", &seconds)?),
            (None, Some(minutes)) => {
                Duration::minutes(positive("AUTH_TOKEN_TTL_MINUTES", &minutes)?)
            }
            (None, None) => Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
        };

        Ok(Self {
            auth_secret,
            token_ttl,
            hash_salt: lookup("HASH_SALT"),
        })
    }

    /// Config with a fixed secret and the default TTL.
    pub fn with_secret(auth_secret: impl Into<String>) -> Self {
        Self {
            auth_secret: auth_secret.into(),
            token_ttl: Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
            hash_salt: None,
        }
    }

    /// Get the signing secret as bytes.
    pub fn auth_secret_bytes(&self) -> &[u8] {
        self.auth_secret.as_bytes()
    }
}

fn positive(key: &str, raw: &str) -> AppResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(AppError::config(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}
