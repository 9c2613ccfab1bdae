//! Job listing handlers: browsing, creation, shortlists and bulk upload.

use axum::{
    extract::{DefaultBodyLimit, Extension, Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use common::{AppError, AppResult};
use document_service_lib::{ImportTarget, Page};
use domain::{JobListing, JobListingData, ShortlistedListing};

use crate::extractors::ValidatedJson;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Multipart field carrying the uploaded file
const UPLOAD_FIELD: &str = "file";

/// Paging and search parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListingQuery {
    /// 1-based page number
    pub page: Option<i64>,
    /// Page size, capped by the server
    pub size: Option<i64>,
    /// Case-insensitive title search
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListingPageResponse {
    pub page: u64,
    pub size: u64,
    pub element_count: u64,
    pub items: Vec<JobListing>,
}

impl From<Page<JobListing>> for ListingPageResponse {
    fn from(page: Page<JobListing>) -> Self {
        Self {
            page: page.page,
            size: page.size,
            element_count: page.element_count,
            items: page.items,
        }
    }
}

/// Accepted import job
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub job_id: Uuid,
    pub file_extension: String,
    pub batch_size: usize,
}

/// Public listing routes
pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_listings))
        .route("/by_id/:id", get(get_listing))
}

/// Listing routes behind the bearer middleware
pub fn protected_listing_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", post(create_listing))
        .route("/shortlist", get(shortlisted))
        .route("/shortlist/:id", post(shortlist))
        .route(
            "/upload",
            post(upload_listings).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

/// Page through listings, newest first
#[utoipa::path(
    get,
    path = "/listing",
    tag = "Listings",
    params(ListingQuery),
    responses(
        (status = 200, description = "Page of listings", body = ListingPageResponse),
        (status = 400, description = "Invalid query")
    )
)]
pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> AppResult<Json<ListingPageResponse>> {
    let size = query
        .size
        .unwrap_or(i64::try_from(state.config.max_items_per_page).unwrap_or(i64::MAX));
    let page = state
        .listings
        .get_page(query.page.unwrap_or(1), size, query.search)
        .await?;

    Ok(Json(page.into()))
}

/// Get listing by ID
#[utoipa::path(
    get,
    path = "/listing/by_id/{id}",
    tag = "Listings",
    params(
        ("id" = Uuid, Path, description = "Listing ID")
    ),
    responses(
        (status = 200, description = "Listing", body = JobListing),
        (status = 404, description = "Listing not found")
    )
)]
pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JobListing>> {
    Ok(Json(state.listings.get_by_id(id).await?))
}

/// Create a listing
#[utoipa::path(
    post,
    path = "/listing",
    tag = "Listings",
    security(("bearer_auth" = [])),
    request_body = JobListingData,
    responses(
        (status = 201, description = "Listing created", body = JobListing),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_listing(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<JobListingData>,
) -> AppResult<(StatusCode, Json<JobListing>)> {
    let listing = state.listings.create_listing(payload).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

/// Shortlist a listing for the current user
#[utoipa::path(
    post,
    path = "/listing/shortlist/{id}",
    tag = "Listings",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Listing ID")
    ),
    responses(
        (status = 200, description = "Listing shortlisted", body = ShortlistedListing),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Listing not found")
    )
)]
pub async fn shortlist(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ShortlistedListing>> {
    let entry = state.listings.shortlist_listing(current_user.id, id).await?;
    Ok(Json(entry))
}

/// Listings shortlisted by the current user
#[utoipa::path(
    get,
    path = "/listing/shortlist",
    tag = "Listings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Shortlisted listings", body = Vec<JobListing>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn shortlisted(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<JobListing>>> {
    Ok(Json(state.listings.shortlisted_for(current_user.id).await?))
}

/// Queue a CSV file of listings for import
#[utoipa::path(
    post,
    path = "/listing/upload",
    tag = "Listings",
    security(("bearer_auth" = [])),
    request_body(content_type = "multipart/form-data", description = "CSV file in the `file` field"),
    responses(
        (status = 202, description = "Import queued", body = UploadResponse),
        (status = 400, description = "Missing or unsupported file"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn upload_listings(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let job = state
            .imports
            .import_file(
                file_name.as_deref(),
                content_type.as_deref(),
                field,
                ImportTarget::JobListings,
            )
            .await?;
        info!("User {} queued import job {}", current_user.id, job.id);

        return Ok((
            StatusCode::ACCEPTED,
            Json(UploadResponse {
                job_id: job.id,
                file_extension: job.file_extension,
                batch_size: job.batch_size,
            }),
        ));
    }

    Err(AppError::BadRequest(format!(
        "Multipart field '{}' is missing",
        UPLOAD_FIELD
    )))
}
