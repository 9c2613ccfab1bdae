//! OpenAPI documentation.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::handlers::auth_handler::{LoginRequest, TokenResponse};
use crate::handlers::listing_handler::{ListingPageResponse, UploadResponse};
use domain::{
    Currency, ExperienceLevel, JobListing, JobListingData, ShortlistedListing, UserData,
    UserResponse, WorkplaceType,
};

/// API documentation struct.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::auth_handler::register,
        crate::handlers::auth_handler::login,
        crate::handlers::user_handler::get_current_user,
        crate::handlers::user_handler::get_user,
        crate::handlers::user_handler::update_user,
        crate::handlers::listing_handler::list_listings,
        crate::handlers::listing_handler::get_listing,
        crate::handlers::listing_handler::create_listing,
        crate::handlers::listing_handler::shortlist,
        crate::handlers::listing_handler::shortlisted,
        crate::handlers::listing_handler::upload_listings,
    ),
    components(
        schemas(
            UserData,
            LoginRequest,
            TokenResponse,
            UserResponse,
            JobListing,
            JobListingData,
            Currency,
            WorkplaceType,
            ExperienceLevel,
            ShortlistedListing,
            ListingPageResponse,
            UploadResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration and login"),
        (name = "Users", description = "User profile endpoints"),
        (name = "Listings", description = "Job listings, shortlists and imports"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
