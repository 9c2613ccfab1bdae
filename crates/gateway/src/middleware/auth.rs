//! Authentication middleware.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{User, BEARER_TOKEN_PREFIX};

use crate::state::AppState;

/// Current authenticated user resolved from the bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl CurrentUser {
    fn from_user(user: User) -> AppResult<Self> {
        Ok(Self {
            id: user.id.ok_or(AppError::Unauthorized)?,
            username: user.username,
            email: user.email,
        })
    }
}

/// Users may only act on their own account.
pub fn require_self(user: &CurrentUser, id: Uuid) -> AppResult<()> {
    if user.id == id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Authentication middleware that validates bearer tokens.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&request)?;

    // Token must be valid and its user must still exist
    let user = state.auth.get_user_from_token(token).await?;
    let current_user = CurrentUser::from_user(user)?;
    debug!("Authenticated request for user {}", current_user.id);

    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}

/// Extract bearer token from Authorization header.
fn extract_token(request: &Request<Body>) -> AppResult<String> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    auth_header
        .strip_prefix(BEARER_TOKEN_PREFIX)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(header: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token(&request(Some("Bearer abc.def"))).unwrap(), "abc.def");
        assert!(extract_token(&request(Some("Basic abc"))).is_err());
        assert!(extract_token(&request(Some("Bearer "))).is_err());
        assert!(extract_token(&request(None)).is_err());
    }

    #[test]
    fn test_require_self() {
        let user = CurrentUser {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@x.com".into(),
        };
        assert!(require_self(&user, user.id).is_ok());
        assert!(matches!(
            require_self(&user, Uuid::new_v4()),
            Err(AppError::Forbidden)
        ));
    }
}
