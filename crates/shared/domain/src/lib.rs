//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! Entities declare their persisted shape through [`EntityDescriptor`] values
//! collected in the static [`ENTITY_TYPES`] table.

pub mod constants;
pub mod entity;
pub mod error;
pub mod job_listing;
pub mod password;
pub mod shortlist;
pub mod user;

pub use constants::*;
pub use entity::{Entity, EntityDescriptor, OrderBy, ENTITY_TYPES};
pub use error::{DomainError, DomainResult};
pub use job_listing::{
    Currency, ExperienceLevel, JobListing, JobListingData, WorkplaceType, JOB_LISTINGS,
};
pub use password::{Password, PasswordPolicy};
pub use shortlist::{ShortlistedListing, ShortlistedListingData, SHORTLISTED_LISTINGS};
pub use user::{User, UserData, UserResponse, USERS};
