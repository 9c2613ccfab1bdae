//! Document store seam.
//!
//! Repositories talk to the store only through [`DocumentStore`]; backends
//! are obtained from a [`StoreConnector`] given the current credentials.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use common::{AppResult, StoreCredentials};
use domain::{EntityDescriptor, OrderBy};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Stored document body, without its identifier.
pub type Document = Map<String, Value>;

/// Pseudo-field addressing the store-assigned identifier.
pub const ID_FIELD: &str = "id";

/// A document read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: Uuid,
    pub body: Document,
}

impl StoredDocument {
    pub fn new(id: Uuid, body: Document) -> Self {
        Self { id, body }
    }

    /// Body with the identifier injected as `id`.
    pub fn into_value(self) -> Value {
        let mut body = self.body;
        body.insert(ID_FIELD.to_string(), Value::String(self.id.to_string()));
        Value::Object(body)
    }
}

/// Filter expression over document fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the value (or, for list fields, contains it)
    Eq(String, Value),
    /// Field equals one of the values
    In(String, Vec<Value>),
    /// Case-insensitive substring match on a text field
    Contains(String, String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn id(id: Uuid) -> Self {
        Filter::Eq(ID_FIELD.to_string(), Value::String(id.to_string()))
    }

    pub fn ids(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Filter::In(
            ID_FIELD.to_string(),
            ids.into_iter()
                .map(|id| Value::String(id.to_string()))
                .collect(),
        )
    }

    pub fn contains(field: impl Into<String>, text: impl Into<String>) -> Self {
        Filter::Contains(field.into(), text.into())
    }
}

/// Options of a find call. Filters are combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub filters: Vec<Filter>,
    pub sort: Vec<OrderBy>,
    pub skip: u64,
    pub limit: Option<u64>,
}

/// Async access to one document database.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Identifies the connection this handle was opened on.
    fn connection_id(&self) -> Uuid;

    /// Prepare storage and indexes for an entity's collection.
    async fn ensure_collection(&self, descriptor: &'static EntityDescriptor) -> AppResult<()>;

    async fn find(&self, collection: &str, options: FindOptions) -> AppResult<Vec<StoredDocument>>;

    async fn count(&self, collection: &str, filters: Vec<Filter>) -> AppResult<u64>;

    /// Store a new document, returning its freshly assigned identifier.
    async fn insert_one(&self, collection: &str, body: Document) -> AppResult<Uuid>;

    /// Store a batch of documents, returning identifiers in input order.
    async fn insert_many(&self, collection: &str, bodies: Vec<Document>) -> AppResult<Vec<Uuid>>;

    /// Replace the document with `id`, inserting it if absent.
    async fn replace_one(&self, collection: &str, id: Uuid, body: Document) -> AppResult<()>;

    /// Remove the document with `id`. Returns whether one was removed.
    async fn delete_one(&self, collection: &str, id: Uuid) -> AppResult<bool>;

    async fn ping(&self) -> AppResult<()>;

    /// Close the connection. Later calls on this handle fail.
    async fn close(&self) -> AppResult<()>;
}

/// Opens store connections.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self, credentials: &StoreCredentials) -> AppResult<Arc<dyn DocumentStore>>;
}
