//! Route configuration.

use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{
    auth_routes, health_routes, listing_routes, protected_listing_routes, protected_user_routes,
    user_routes,
};
use crate::middleware::auth_middleware;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let bearer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    Router::new()
        // Health check (no auth)
        .nest("/health", health_routes())
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Registration, login and profiles
        .nest(
            "/auth",
            auth_routes().nest(
                "/user",
                user_routes().merge(protected_user_routes().route_layer(bearer.clone())),
            ),
        )
        // Listings: reads are public, writes need a token
        .nest(
            "/listing",
            listing_routes().merge(
                protected_listing_routes(state.config.max_upload_bytes).route_layer(bearer),
            ),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
