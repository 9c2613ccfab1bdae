//! Document Service Library
//!
//! Generic document repositories over a pluggable store, the registry that
//! owns the store connection, and the services built on top: pagination,
//! job listings with shortlists and bulk import.

pub mod infra;
pub mod repository;
pub mod service;

use std::sync::Arc;

use common::{AppResult, StoreBackend};

pub use infra::{connector_for, Filter};
pub use repository::{
    EntityInput, JobListingRepository, Repository, RepositoryRegistry, RepositoryType,
    ShortlistRepository, UserRepository,
};
pub use service::{
    DocumentService, ImportJob, ImportReport, ImportService, ImportTarget, ImportWorker,
    JobListingManager, JobListingService, Page,
};

/// Registry for the backend named by `STORE_BACKEND`, credentials from the
/// environment.
pub fn registry_from_env() -> AppResult<Arc<RepositoryRegistry>> {
    let backend = StoreBackend::from_env()?;
    Ok(Arc::new(RepositoryRegistry::new(connector_for(backend))))
}
