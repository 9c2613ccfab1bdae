//! Auth service tests against the in-memory store.

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use auth_service_lib::{AuthService, AuthServiceConfig, Authenticator};
use common::{AppError, StoreCredentials};
use document_service_lib::infra::MemoryConnector;
use document_service_lib::{RepositoryRegistry, UserRepository};
use domain::UserData;

const SECRET: &str = "0123456789abcdef0123456789abcdef";
const PASSWORD: &str = "qwe123qwe123";

fn authenticator_with(config: AuthServiceConfig) -> (Arc<RepositoryRegistry>, Authenticator) {
    let credentials = StoreCredentials {
        host: "localhost".into(),
        port: 5432,
        user: "test".into(),
        password: "test".into(),
        db_name: format!("auth_{}", Uuid::new_v4().simple()),
    };
    let registry = Arc::new(RepositoryRegistry::with_credentials(
        Arc::new(MemoryConnector::new()),
        credentials,
    ));
    (registry.clone(), Authenticator::new(registry, config))
}

fn authenticator() -> (Arc<RepositoryRegistry>, Authenticator) {
    authenticator_with(AuthServiceConfig::with_secret(SECRET))
}

fn user_data(username: &str, email: &str) -> UserData {
    UserData {
        username: username.into(),
        email: email.into(),
        password: PASSWORD.into(),
    }
}

#[tokio::test]
async fn test_create_user_stores_hash() {
    let (registry, auth) = authenticator();

    let user = auth.create_user(user_data("alice", "alice@x.com")).await.unwrap();

    assert!(user.id.is_some());
    assert_ne!(user.password, PASSWORD);
    assert!(auth.verify_password(PASSWORD, &user.password));

    let stored = registry
        .repository::<UserRepository>()
        .await
        .unwrap()
        .get_by_id(user.id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, user);
}

#[tokio::test]
async fn test_username_conflict_is_reported_before_email() {
    let (_, auth) = authenticator();
    auth.create_user(user_data("alice", "alice@x.com")).await.unwrap();

    // Both collide: username wins
    let err = auth
        .create_user(user_data("alice", "alice@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UsernameExists(ref name) if name == "alice"));

    let err = auth
        .create_user(user_data("alice2", "alice@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmailExists(ref email) if email == "alice@x.com"));
}

#[tokio::test]
async fn test_short_password_is_rejected() {
    let (_, auth) = authenticator();
    let mut data = user_data("alice", "alice@x.com");
    data.password = "short".into();

    let err = auth.create_user(data).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_login_by_username_or_email() {
    let (_, auth) = authenticator();
    let user = auth.create_user(user_data("alice", "alice@x.com")).await.unwrap();

    for identifier in ["alice", "alice@x.com"] {
        let token = auth
            .login(identifier.to_string(), PASSWORD.to_string())
            .await
            .unwrap();
        assert_eq!(auth.decode_token(&token.token).unwrap().user_id, user.id.unwrap());

        let err = auth
            .login(identifier.to_string(), "wrong-password".to_string())
            .await
            .unwrap_err();
        match err {
            AppError::IncorrectPassword { user: rejected, attempt } => {
                assert_eq!(rejected.id, user.id);
                assert_eq!(attempt.expose(), "wrong-password");
            }
            other => panic!("expected incorrect password, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_login_unknown_user() {
    let (_, auth) = authenticator();

    let err = auth
        .login("nobody".to_string(), PASSWORD.to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UserNotFound(ref id) if id == "nobody"));
}

#[tokio::test]
async fn test_update_user_rehashes_password() {
    let (_, auth) = authenticator();
    let user = auth.create_user(user_data("alice", "alice@x.com")).await.unwrap();
    let id = user.id.unwrap();

    // Same password still gets a fresh hash
    let updated = auth
        .update_user(id, user_data("alice", "alice@new.com"))
        .await
        .unwrap();
    assert_eq!(updated.id, Some(id));
    assert_eq!(updated.email, "alice@new.com");
    assert_ne!(updated.password, user.password);
    assert!(auth.verify_password(PASSWORD, &updated.password));

    let err = auth
        .update_user(Uuid::new_v4(), user_data("ghost", "ghost@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: "User", .. }));
}

#[tokio::test]
async fn test_update_user_keeps_other_users_names() {
    let (_, auth) = authenticator();
    auth.create_user(user_data("alice", "alice@x.com")).await.unwrap();
    let bob = auth.create_user(user_data("bob", "bob@x.com")).await.unwrap();

    let err = auth
        .update_user(bob.id.unwrap(), user_data("alice", "bob@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UsernameExists(_)));
}

#[tokio::test]
async fn test_token_resolves_user() {
    let (_, auth) = authenticator();
    let user = auth.create_user(user_data("alice", "alice@x.com")).await.unwrap();

    let token = auth.create_token(&user, None).unwrap();
    assert_eq!(auth.get_user_from_token(token.token).await.unwrap(), user);

    let mut ghost = user.clone();
    ghost.id = Some(Uuid::new_v4());
    let token = auth.create_token(&ghost, None).unwrap();
    assert!(matches!(
        auth.get_user_from_token(token.token).await,
        Err(AppError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_token_expires_after_configured_ttl() {
    let mut config = AuthServiceConfig::with_secret(SECRET);
    config.token_ttl = Duration::seconds(1);
    let (_, auth) = authenticator_with(config);
    let user = auth.create_user(user_data("alice", "alice@x.com")).await.unwrap();

    let token = auth
        .login("alice".to_string(), PASSWORD.to_string())
        .await
        .unwrap();
    assert!(auth.decode_token(&token.token).is_ok());

    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;
    assert!(auth.decode_token(&token.token).is_err());
    assert!(auth.get_user_by_id(user.id.unwrap()).await.unwrap().is_some());
}
