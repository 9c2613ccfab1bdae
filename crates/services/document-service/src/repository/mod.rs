//! Repository layer for data access.

mod base;
mod entities;
mod registry;

pub use base::{BatchInsert, DeleteTarget, EntityInput, FindQuery, Repository};
pub use entities::{JobListingRepository, RepositoryType, ShortlistRepository, UserRepository};
pub use registry::RepositoryRegistry;
