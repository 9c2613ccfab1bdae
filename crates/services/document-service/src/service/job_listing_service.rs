//! Job listing service - browsing, creation and shortlists.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{JobListing, JobListingData, ShortlistedListing, ShortlistedListingData};

use super::document_service::{DocumentService, Page};
use crate::infra::Filter;
use crate::repository::{JobListingRepository, RepositoryRegistry, ShortlistRepository};

/// Job listing service trait for dependency injection.
#[async_trait]
pub trait JobListingService: Send + Sync {
    /// Page of listings, newest first, optionally narrowed by a title search
    async fn get_page(&self, page: i64, size: i64, search: Option<String>)
        -> AppResult<Page<JobListing>>;

    /// Listing by id (not-found if absent)
    async fn get_by_id(&self, id: Uuid) -> AppResult<JobListing>;

    async fn create_listing(&self, data: JobListingData) -> AppResult<JobListing>;

    /// Shortlist a listing for a user. Shortlisting twice returns the first record.
    async fn shortlist_listing(&self, user_id: Uuid, listing_id: Uuid)
        -> AppResult<ShortlistedListing>;

    /// Listings a user has shortlisted
    async fn shortlisted_for(&self, user_id: Uuid) -> AppResult<Vec<JobListing>>;
}

/// Concrete implementation of JobListingService over the registry.
pub struct JobListingManager {
    documents: DocumentService<JobListingRepository>,
}

impl JobListingManager {
    pub fn new(registry: Arc<RepositoryRegistry>, max_per_page: u64) -> Self {
        Self {
            documents: DocumentService::new(registry, max_per_page),
        }
    }

    pub fn documents(&self) -> &DocumentService<JobListingRepository> {
        &self.documents
    }

    async fn listings(&self) -> AppResult<Arc<JobListingRepository>> {
        self.documents.registry().repository().await
    }

    async fn shortlists(&self) -> AppResult<Arc<ShortlistRepository>> {
        self.documents.registry().repository().await
    }
}

#[async_trait]
impl JobListingService for JobListingManager {
    async fn get_page(
        &self,
        page: i64,
        size: i64,
        search: Option<String>,
    ) -> AppResult<Page<JobListing>> {
        let filters = search
            .filter(|s| !s.trim().is_empty())
            .map(|s| vec![Filter::contains("title", s.trim())])
            .unwrap_or_default();

        self.documents.get_page(page, size, filters, None).await
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<JobListing> {
        self.documents.get_by_id(id).await
    }

    async fn create_listing(&self, data: JobListingData) -> AppResult<JobListing> {
        let listing = self.listings().await?.create(data).await?;
        info!("Job listing created: {:?}", listing.id);
        Ok(listing)
    }

    async fn shortlist_listing(
        &self,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> AppResult<ShortlistedListing> {
        if self.listings().await?.get_by_id(listing_id).await?.is_none() {
            return Err(AppError::not_found("JobListing", listing_id));
        }

        let shortlists = self.shortlists().await?;
        if let Some(existing) = shortlists.fetch_entry(user_id, listing_id).await? {
            return Ok(existing);
        }

        let entry = shortlists
            .create(ShortlistedListingData {
                user_id,
                listing_id,
            })
            .await?;
        info!("User {} shortlisted listing {}", user_id, listing_id);
        Ok(entry)
    }

    async fn shortlisted_for(&self, user_id: Uuid) -> AppResult<Vec<JobListing>> {
        let entries = self.shortlists().await?.fetch_for_user(user_id).await?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let ids = entries.into_iter().map(|entry| entry.listing_id);
        self.listings()
            .await?
            .find(vec![Filter::ids(ids)], None)?
            .to_list()
            .await
    }
}
