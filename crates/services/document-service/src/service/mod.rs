//! Service layer - business logic over the repositories.

mod document_service;
mod import_service;
mod job_listing_service;

pub use document_service::{DocumentService, Page};
pub use import_service::{
    resolve_extension, ImportJob, ImportReport, ImportService, ImportTarget, ImportWorker,
};
pub use job_listing_service::{JobListingManager, JobListingService};
