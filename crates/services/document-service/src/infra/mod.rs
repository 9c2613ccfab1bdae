//! Infrastructure layer - document store backends.

pub mod memory;
pub mod sql;
mod store;

pub use memory::{MemoryConnector, MemoryStore};
pub use sql::{SqlConnector, SqlStore};
pub use store::{
    Document, DocumentStore, Filter, FindOptions, StoreConnector, StoredDocument, ID_FIELD,
};

#[cfg(any(test, feature = "test-utils"))]
pub use store::{MockDocumentStore, MockStoreConnector};

use std::sync::Arc;

use common::StoreBackend;

/// Connector for the configured backend.
pub fn connector_for(backend: StoreBackend) -> Arc<dyn StoreConnector> {
    match backend {
        StoreBackend::Postgres => Arc::new(SqlConnector),
        StoreBackend::Memory => Arc::new(MemoryConnector::new()),
    }
}
