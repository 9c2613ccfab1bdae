//! In-process document store.
//!
//! Databases are keyed by name and shared by every connection the same
//! [`MemoryConnector`] opens, so separate handles observe the same data.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use common::{AppError, AppResult, StoreCredentials};
use domain::{EntityDescriptor, OrderBy};

use super::store::{
    Document, DocumentStore, Filter, FindOptions, StoreConnector, StoredDocument, ID_FIELD,
};

type Collections = HashMap<String, Vec<StoredDocument>>;

/// Connector handing out [`MemoryStore`] handles.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    databases: Arc<Mutex<HashMap<String, Arc<RwLock<Collections>>>>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self, credentials: &StoreCredentials) -> AppResult<Arc<dyn DocumentStore>> {
        let data = self
            .databases
            .lock()
            .await
            .entry(credentials.db_name.clone())
            .or_default()
            .clone();

        let store = MemoryStore {
            connection_id: Uuid::new_v4(),
            data,
            closed: AtomicBool::new(false),
        };
        debug!(
            "Opened in-memory connection {} to database {}",
            store.connection_id, credentials.db_name
        );

        Ok(Arc::new(store))
    }
}

/// One connection onto an in-memory database.
pub struct MemoryStore {
    connection_id: Uuid,
    data: Arc<RwLock<Collections>>,
    closed: AtomicBool,
}

impl MemoryStore {
    fn check_open(&self) -> AppResult<()> {
        if self.closed.load(AtomicOrdering::SeqCst) {
            return Err(AppError::internal(format!(
                "Connection {} is closed",
                self.connection_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    async fn ensure_collection(&self, descriptor: &'static EntityDescriptor) -> AppResult<()> {
        self.check_open()?;
        self.data
            .write()
            .await
            .entry(descriptor.collection.to_string())
            .or_default();
        Ok(())
    }

    async fn find(&self, collection: &str, options: FindOptions) -> AppResult<Vec<StoredDocument>> {
        self.check_open()?;
        let data = self.data.read().await;
        let Some(documents) = data.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<StoredDocument> = documents
            .iter()
            .filter(|doc| options.filters.iter().all(|f| matches(f, doc)))
            .cloned()
            .collect();

        if !options.sort.is_empty() {
            matched.sort_by(|a, b| compare_documents(a, b, &options.sort));
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(matched.into_iter().skip(skip).take(limit).collect())
    }

    async fn count(&self, collection: &str, filters: Vec<Filter>) -> AppResult<u64> {
        self.check_open()?;
        let data = self.data.read().await;
        let count = data
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filters.iter().all(|f| matches(f, doc)))
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn insert_one(&self, collection: &str, body: Document) -> AppResult<Uuid> {
        self.check_open()?;
        let id = Uuid::new_v4();
        self.data
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(StoredDocument::new(id, body));
        Ok(id)
    }

    async fn insert_many(&self, collection: &str, bodies: Vec<Document>) -> AppResult<Vec<Uuid>> {
        self.check_open()?;
        let mut data = self.data.write().await;
        let documents = data.entry(collection.to_string()).or_default();

        let ids = bodies
            .into_iter()
            .map(|body| {
                let id = Uuid::new_v4();
                documents.push(StoredDocument::new(id, body));
                id
            })
            .collect();
        Ok(ids)
    }

    async fn replace_one(&self, collection: &str, id: Uuid, body: Document) -> AppResult<()> {
        self.check_open()?;
        let mut data = self.data.write().await;
        let documents = data.entry(collection.to_string()).or_default();

        match documents.iter_mut().find(|doc| doc.id == id) {
            Some(existing) => existing.body = body,
            None => documents.push(StoredDocument::new(id, body)),
        }
        Ok(())
    }

    async fn delete_one(&self, collection: &str, id: Uuid) -> AppResult<bool> {
        self.check_open()?;
        let mut data = self.data.write().await;
        let Some(documents) = data.get_mut(collection) else {
            return Ok(false);
        };

        let before = documents.len();
        documents.retain(|doc| doc.id != id);
        Ok(documents.len() < before)
    }

    async fn ping(&self) -> AppResult<()> {
        self.check_open()
    }

    async fn close(&self) -> AppResult<()> {
        self.closed.store(true, AtomicOrdering::SeqCst);
        debug!("Closed in-memory connection {}", self.connection_id);
        Ok(())
    }
}

fn field_value(doc: &StoredDocument, field: &str) -> Value {
    if field == ID_FIELD {
        return Value::String(doc.id.to_string());
    }
    doc.body.get(field).cloned().unwrap_or(Value::Null)
}

fn value_matches(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::Array(items) if !expected.is_array() => items.contains(expected),
        _ => actual == expected,
    }
}

fn matches(filter: &Filter, doc: &StoredDocument) -> bool {
    match filter {
        Filter::Eq(field, expected) => value_matches(&field_value(doc, field), expected),
        Filter::In(field, values) => {
            let actual = field_value(doc, field);
            values.iter().any(|v| value_matches(&actual, v))
        }
        Filter::Contains(field, text) => match field_value(doc, field) {
            Value::String(s) => s.to_lowercase().contains(&text.to_lowercase()),
            _ => false,
        },
        Filter::And(filters) => filters.iter().all(|f| matches(f, doc)),
        Filter::Or(filters) => filters.iter().any(|f| matches(f, doc)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_documents(a: &StoredDocument, b: &StoredDocument, sort: &[OrderBy]) -> Ordering {
    for order in sort {
        let ordering = compare_values(
            &field_value(a, &order.field_name),
            &field_value(b, &order.field_name),
        );
        let ordering = if order.ascending {
            ordering
        } else {
            ordering.reverse()
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credentials(db_name: &str) -> StoreCredentials {
        StoreCredentials {
            host: "localhost".into(),
            port: 27017,
            user: "test".into(),
            password: "test".into(),
            db_name: db_name.into(),
        }
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => Document::new(),
        }
    }

    #[tokio::test]
    async fn test_connections_share_one_database() {
        let connector = MemoryConnector::new();
        let first = connector.connect(&credentials("jobs")).await.unwrap();
        let second = connector.connect(&credentials("jobs")).await.unwrap();
        let other = connector.connect(&credentials("elsewhere")).await.unwrap();

        assert_ne!(first.connection_id(), second.connection_id());

        first.insert_one("users", doc(json!({"username": "alice"}))).await.unwrap();
        assert_eq!(second.count("users", vec![]).await.unwrap(), 1);
        assert_eq!(other.count("users", vec![]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_closed_connection_fails() {
        let store = MemoryConnector::new()
            .connect(&credentials("jobs"))
            .await
            .unwrap();
        store.close().await.unwrap();

        assert!(store.ping().await.is_err());
        assert!(store.count("users", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn test_find_filters_sorts_and_pages() {
        let store = MemoryConnector::new()
            .connect(&credentials("jobs"))
            .await
            .unwrap();
        store
            .insert_many(
                "job_listings",
                vec![
                    doc(json!({"title": "Rust Engineer", "rank": 2, "skills": ["rust"]})),
                    doc(json!({"title": "Go Engineer", "rank": 3, "skills": ["go"]})),
                    doc(json!({"title": "Senior rust dev", "rank": 1, "skills": ["rust", "sql"]})),
                ],
            )
            .await
            .unwrap();

        let options = FindOptions {
            filters: vec![Filter::contains("title", "RUST")],
            sort: vec![OrderBy::asc("rank")],
            ..Default::default()
        };
        let found = store.find("job_listings", options).await.unwrap();
        let titles: Vec<_> = found.iter().map(|d| d.body["title"].clone()).collect();
        assert_eq!(titles, vec![json!("Senior rust dev"), json!("Rust Engineer")]);

        let options = FindOptions {
            filters: vec![Filter::eq("skills", "sql")],
            ..Default::default()
        };
        assert_eq!(store.find("job_listings", options).await.unwrap().len(), 1);

        let options = FindOptions {
            sort: vec![OrderBy::desc("rank")],
            skip: 1,
            limit: Some(1),
            ..Default::default()
        };
        let page = store.find("job_listings", options).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].body["rank"], json!(2));
    }

    #[tokio::test]
    async fn test_replace_upserts_and_delete_reports() {
        let store = MemoryConnector::new()
            .connect(&credentials("jobs"))
            .await
            .unwrap();
        let id = Uuid::new_v4();

        store.replace_one("users", id, doc(json!({"n": 1}))).await.unwrap();
        store.replace_one("users", id, doc(json!({"n": 2}))).await.unwrap();

        let found = store
            .find(
                "users",
                FindOptions {
                    filters: vec![Filter::id(id)],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(found, vec![StoredDocument::new(id, doc(json!({"n": 2})))]);

        assert!(store.delete_one("users", id).await.unwrap());
        assert!(!store.delete_one("users", id).await.unwrap());
    }
}
