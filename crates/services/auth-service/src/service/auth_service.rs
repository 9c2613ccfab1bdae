//! Authentication service - registration, login and tokens.
//!
//! Users are stored through the [`UserRepository`]; passwords are hashed with
//! the process [`PasswordPolicy`] on a blocking thread.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use crate::config::AuthServiceConfig;
use common::{AppError, AppResult, Redacted};
use document_service_lib::{RepositoryRegistry, UserRepository};
use domain::{Password, PasswordPolicy, User, UserData};

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signed token handed to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Identity carried inside a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenData {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<Claims> for TokenData {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            email: claims.email,
        }
    }
}

/// Authentication service trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn get_user_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Register a new user. Username uniqueness is checked before email.
    async fn create_user(&self, data: UserData) -> AppResult<User>;

    /// Replace a user's profile, re-hashing the password.
    async fn update_user(&self, id: Uuid, data: UserData) -> AppResult<User>;

    /// Log in by username or email and issue a token
    async fn login(&self, identifier: String, password: String) -> AppResult<Token>;

    /// Sign a token for `user`, valid for `ttl` or the configured lifetime
    fn create_token(&self, user: &User, ttl: Option<Duration>) -> AppResult<Token>;

    /// Verify signature and expiry and return the embedded identity
    fn decode_token(&self, token: &str) -> AppResult<TokenData>;

    /// Resolve the user a token was issued to
    async fn get_user_from_token(&self, token: String) -> AppResult<User>;

    fn verify_password(&self, plain_text: &str, hash: &str) -> bool;

    fn hash_password(&self, plain_text: &str) -> AppResult<Password>;
}

/// Concrete implementation of AuthService over the repository registry.
pub struct Authenticator {
    registry: Arc<RepositoryRegistry>,
    config: AuthServiceConfig,
    policy: PasswordPolicy,
}

impl Authenticator {
    pub fn new(registry: Arc<RepositoryRegistry>, config: AuthServiceConfig) -> Self {
        let policy = PasswordPolicy::new(config.hash_salt.clone());
        Self {
            registry,
            config,
            policy,
        }
    }

    pub fn config(&self) -> &AuthServiceConfig {
        &self.config
    }

    async fn users(&self) -> AppResult<Arc<UserRepository>> {
        self.registry.repository::<UserRepository>().await
    }

    /// Hash off the async executor; argon2 is deliberately slow.
    async fn hash_blocking(&self, plain_text: String) -> AppResult<Password> {
        let policy = self.policy.clone();
        tokio::task::spawn_blocking(move || policy.hash(&plain_text))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {}", e)))?
            .map_err(AppError::from)
    }

    async fn verify_blocking(&self, plain_text: String, hash: String) -> AppResult<bool> {
        let policy = self.policy.clone();
        tokio::task::spawn_blocking(move || policy.verify(&plain_text, &hash))
            .await
            .map_err(|e| AppError::internal(format!("Password verification task failed: {}", e)))
    }

    /// Reject a username or email already held by a user other than `current`.
    async fn ensure_unique(&self, data: &UserData, current: Option<Uuid>) -> AppResult<()> {
        let users = self.users().await?;
        let taken_by_other = |user: Option<User>| match (user, current) {
            (Some(user), Some(id)) => user.id != Some(id),
            (Some(_), None) => true,
            (None, _) => false,
        };

        if taken_by_other(users.fetch_by_username(&data.username).await?) {
            return Err(AppError::UsernameExists(data.username.clone()));
        }
        if taken_by_other(users.fetch_by_email(&data.email).await?) {
            return Err(AppError::EmailExists(data.email.clone()));
        }
        Ok(())
    }

    async fn to_stored_user(&self, data: UserData, id: Option<Uuid>) -> AppResult<User> {
        let password = self.hash_blocking(data.password).await?;
        Ok(User {
            id,
            username: data.username,
            email: data.email,
            password: password.into_string(),
        })
    }
}

#[async_trait]
impl AuthService for Authenticator {
    async fn get_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        self.users().await?.get_by_id(id).await
    }

    async fn create_user(&self, data: UserData) -> AppResult<User> {
        self.ensure_unique(&data, None).await?;

        let user = self.to_stored_user(data, None).await?;
        let user = self.users().await?.create(user).await?;
        info!("User registered: {} ({:?})", user.username, user.id);

        Ok(user)
    }

    async fn update_user(&self, id: Uuid, data: UserData) -> AppResult<User> {
        let users = self.users().await?;
        if users.get_by_id(id).await?.is_none() {
            return Err(AppError::not_found("User", id));
        }
        self.ensure_unique(&data, Some(id)).await?;

        let user = self.to_stored_user(data, Some(id)).await?;
        let user = users.update(user, Some(id)).await?;
        info!("User updated: {}", id);

        Ok(user)
    }

    async fn login(&self, identifier: String, password: String) -> AppResult<Token> {
        let user = self
            .users()
            .await?
            .fetch_by_username_or_email(&identifier)
            .await?
            .ok_or_else(|| AppError::UserNotFound(identifier.clone()))?;

        if !self.verify_blocking(password.clone(), user.password.clone()).await? {
            return Err(AppError::IncorrectPassword {
                user: Box::new(user),
                attempt: Redacted::new(password),
            });
        }

        debug!("User {} logged in", user.username);
        self.create_token(&user, None)
    }

    fn create_token(&self, user: &User, ttl: Option<Duration>) -> AppResult<Token> {
        let user_id = user.id.ok_or_else(|| AppError::MissingId("User".to_string()))?;
        let now = Utc::now();
        let expires_at = now + ttl.unwrap_or(self.config.token_ttl);

        let claims = Claims {
            sub: user_id,
            username: user.username.clone(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.auth_secret_bytes()),
        )?;

        Ok(Token {
            token,
            // Second precision, as stored in the token
            expires_at: Utc
                .timestamp_opt(claims.exp, 0)
                .single()
                .unwrap_or(expires_at),
        })
    }

    fn decode_token(&self, token: &str) -> AppResult<TokenData> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.auth_secret_bytes()),
            &validation,
        )?;

        Ok(data.claims.into())
    }

    async fn get_user_from_token(&self, token: String) -> AppResult<User> {
        let data = self.decode_token(&token)?;
        self.get_user_by_id(data.user_id)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    fn verify_password(&self, plain_text: &str, hash: &str) -> bool {
        self.policy.verify(plain_text, hash)
    }

    fn hash_password(&self, plain_text: &str) -> AppResult<Password> {
        Ok(self.policy.hash(plain_text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> Authenticator {
        let registry = Arc::new(RepositoryRegistry::new(Arc::new(
            document_service_lib::infra::MemoryConnector::new(),
        )));
        Authenticator::new(
            registry,
            AuthServiceConfig::with_secret("0123456789abcdef0123456789abcdef"),
        )
    }

    fn user() -> User {
        User {
            id: Some(Uuid::new_v4()),
            username: "alice".into(),
            email: "alice@x.com".into(),
            password: "irrelevant".into(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let auth = authenticator();
        let user = user();

        let token = auth.create_token(&user, None).unwrap();
        let data = auth.decode_token(&token.token).unwrap();

        assert_eq!(data.user_id, user.id.unwrap());
        assert_eq!(data.username, "alice");
        assert_eq!(data.email, "alice@x.com");
        assert!(token.expires_at > Utc::now() + Duration::hours(23));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let auth = authenticator();
        let token = auth
            .create_token(&user(), Some(Duration::seconds(-5)))
            .unwrap();

        assert!(matches!(auth.decode_token(&token.token), Err(AppError::Jwt(_))));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let auth = authenticator();
        let token = auth.create_token(&user(), None).unwrap();

        let other = Authenticator::new(
            Arc::new(RepositoryRegistry::new(Arc::new(
                document_service_lib::infra::MemoryConnector::new(),
            ))),
            AuthServiceConfig::with_secret("ffffffffffffffffffffffffffffffff"),
        );
        assert!(other.decode_token(&token.token).is_err());
        assert!(auth.decode_token("not.a.token").is_err());
    }

    #[test]
    fn test_token_needs_user_id() {
        let auth = authenticator();
        let mut user = user();
        user.id = None;

        assert!(matches!(
            auth.create_token(&user, None),
            Err(AppError::MissingId(_))
        ));
    }

    #[test]
    fn test_password_helpers() {
        let auth = authenticator();
        let hash = auth.hash_password("qwe123qwe123").unwrap();

        assert!(auth.verify_password("qwe123qwe123", hash.as_str()));
        assert!(!auth.verify_password("qwe123qwe124", hash.as_str()));
        assert!(!auth.verify_password("qwe123qwe123", "qwe123qwe123"));
        assert!(matches!(
            auth.hash_password("short"),
            Err(AppError::Validation(_))
        ));
    }
}
