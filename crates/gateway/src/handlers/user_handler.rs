//! User handlers.

use axum::{
    extract::{Extension, Path, State},
    response::Json,
    routing::{get, put},
    Router,
};
use uuid::Uuid;

use common::{AppError, AppResult, OptionExt};
use domain::{UserData, UserResponse};

use crate::extractors::ValidatedJson;
use crate::middleware::{require_self, CurrentUser};
use crate::state::AppState;

/// Public user routes
pub fn user_routes() -> Router<AppState> {
    Router::new().route("/:id", get(get_user))
}

/// User routes behind the bearer middleware
pub fn protected_user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_current_user))
        .route("/:id", put(update_user))
}

/// Get current authenticated user
#[utoipa::path(
    get,
    path = "/auth/user/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user profile", body = UserResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_current_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .auth
        .get_user_by_id(current_user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(UserResponse::from(user)))
}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/auth/user/{id}",
    tag = "Users",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .auth
        .get_user_by_id(id)
        .await?
        .ok_or_not_found("User", id)?;

    Ok(Json(UserResponse::from(user)))
}

/// Replace own profile
#[utoipa::path(
    put,
    path = "/auth/user/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UserData,
    responses(
        (status = 200, description = "User updated successfully", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Can only update own profile"),
        (status = 409, description = "Username or email taken")
    )
)]
pub async fn update_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UserData>,
) -> AppResult<Json<UserResponse>> {
    require_self(&current_user, id)?;

    let user = state.auth.update_user(id, payload).await?;
    Ok(Json(UserResponse::from(user)))
}
