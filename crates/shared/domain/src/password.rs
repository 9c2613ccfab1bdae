//! Password value object - Domain layer password handling.
//!
//! Hashes are Argon2id PHC strings with a random per-hash salt. An optional
//! application-wide secret (the configured hash salt) is mixed in as the
//! Argon2 secret, so hashes only verify under the same configuration.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::constants::MIN_PASSWORD_LENGTH;
use crate::error::{DomainError, DomainResult};

/// Password value object holding a hash, never the plain text.
#[derive(Clone, PartialEq, Eq)]
pub struct Password {
    hash: String,
}

// Don't expose hash in debug output (security)
impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl Password {
    /// Create a Password from an existing hash (from the store).
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    /// Get the hash string for storage.
    pub fn as_str(&self) -> &str {
        &self.hash
    }

    /// Consume and return the hash string.
    pub fn into_string(self) -> String {
        self.hash
    }
}

impl From<Password> for String {
    fn from(password: Password) -> Self {
        password.hash
    }
}

/// Hashing configuration shared by every password operation of a process.
#[derive(Clone, Default)]
pub struct PasswordPolicy {
    secret: Option<String>,
}

impl std::fmt::Debug for PasswordPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordPolicy")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl PasswordPolicy {
    /// Policy mixing `secret` into every hash. Empty secrets are ignored.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// Hash `plain_text` after checking the minimum length.
    pub fn hash(&self, plain_text: &str) -> DomainResult<Password> {
        if plain_text.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(DomainError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| DomainError::password(format!("Password hash failed: {}", e)))?;

        Ok(Password::from_hash(hash.to_string()))
    }

    /// Verify `plain_text` against a stored hash.
    ///
    /// Returns `false` for mismatches and for hashes in an unrecognized format.
    pub fn verify(&self, plain_text: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        let Ok(argon2) = self.argon2() else {
            return false;
        };

        argon2.verify_password(plain_text.as_bytes(), &parsed).is_ok()
    }

    fn argon2(&self) -> DomainResult<Argon2<'_>> {
        match &self.secret {
            Some(secret) => Argon2::new_with_secret(
                secret.as_bytes(),
                Algorithm::Argon2id,
                Version::V0x13,
                Params::default(),
            )
            .map_err(|e| DomainError::internal(format!("Invalid hash secret: {}", e))),
            None => Ok(Argon2::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let policy = PasswordPolicy::default();
        let plain = "qwe123qwe123";
        let hash = policy.hash(plain).unwrap();

        assert_ne!(hash.as_str(), plain);
        assert!(policy.verify(plain, hash.as_str()));
        assert!(!policy.verify("qwe123qwe123qwewqew", hash.as_str()));
    }

    #[test]
    fn test_raw_password_is_not_a_hash() {
        let policy = PasswordPolicy::default();
        let plain = "qwe123qwe123";
        let hash = policy.hash(plain).unwrap();

        assert!(!policy.verify(plain, plain));
        assert!(!policy.verify(hash.as_str(), hash.as_str()));
    }

    #[test]
    fn test_same_password_different_salts() {
        let policy = PasswordPolicy::default();
        let plain = "SamePassword123";
        let first = policy.hash(plain).unwrap();
        let second = policy.hash(plain).unwrap();

        // Different salts produce different hashes
        assert_ne!(first, second);
        assert!(policy.verify(plain, first.as_str()));
        assert!(policy.verify(plain, second.as_str()));
    }

    #[test]
    fn test_secret_must_match() {
        let peppered = PasswordPolicy::new(Some("app-wide-secret".to_string()));
        let plain = "SecurePassword123!";
        let hash = peppered.hash(plain).unwrap();

        assert!(peppered.verify(plain, hash.as_str()));
        assert!(!PasswordPolicy::default().verify(plain, hash.as_str()));
    }

    #[test]
    fn test_password_too_short() {
        let result = PasswordPolicy::default().hash("short");
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_debug_is_redacted() {
        let hash = Password::from_hash("$argon2id$v=19$secret");
        assert!(!format!("{:?}", hash).contains("secret"));
    }
}
