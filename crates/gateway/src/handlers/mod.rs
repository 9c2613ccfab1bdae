//! HTTP handlers.

pub mod auth_handler;
pub mod health_handler;
pub mod listing_handler;
pub mod user_handler;

pub use auth_handler::auth_routes;
pub use health_handler::health_routes;
pub use listing_handler::{listing_routes, protected_listing_routes};
pub use user_handler::{protected_user_routes, user_routes};
