//! Generic repository over one entity type.
//!
//! Input may be the canonical entity, its data-only companion or a raw field
//! map; everything is coerced into the canonical type before it reaches the
//! store.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;
use validator::Validate;

use common::{AppError, AppResult, FieldError};
use domain::{
    Entity, EntityDescriptor, JobListing, JobListingData, OrderBy, ShortlistedListing,
    ShortlistedListingData, User, UserData,
};

use crate::infra::{Document, DocumentStore, Filter, FindOptions, StoredDocument, ID_FIELD};

/// Accepted input shapes for create and update.
#[derive(Debug, Clone)]
pub enum EntityInput<M: Entity> {
    Model(M),
    Data(M::Data),
    Raw(Document),
}

impl<M: Entity> From<Document> for EntityInput<M> {
    fn from(raw: Document) -> Self {
        EntityInput::Raw(raw)
    }
}

macro_rules! entity_inputs {
    ($($model:ty => $data:ty),* $(,)?) => {
        $(
            impl From<$model> for EntityInput<$model> {
                fn from(model: $model) -> Self {
                    EntityInput::Model(model)
                }
            }

            impl From<$data> for EntityInput<$model> {
                fn from(data: $data) -> Self {
                    EntityInput::Data(data)
                }
            }
        )*
    };
}

entity_inputs! {
    User => UserData,
    JobListing => JobListingData,
    ShortlistedListing => ShortlistedListingData,
}

/// What to delete: an identifier or an entity carrying one.
#[derive(Debug, Clone)]
pub enum DeleteTarget<M> {
    Id(Uuid),
    Entity(M),
}

impl<M> From<Uuid> for DeleteTarget<M> {
    fn from(id: Uuid) -> Self {
        DeleteTarget::Id(id)
    }
}

/// Outcome of a batch insert.
#[derive(Debug, Clone)]
pub struct BatchInsert<M> {
    pub inserted: Vec<M>,
    /// Items that could not be coerced and were left out
    pub skipped: usize,
}

/// Typed access to one collection.
pub struct Repository<M: Entity> {
    store: Arc<dyn DocumentStore>,
    descriptor: &'static EntityDescriptor,
    _model: PhantomData<fn() -> M>,
}

impl<M: Entity> Clone for Repository<M> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            descriptor: self.descriptor,
            _model: PhantomData,
        }
    }
}

impl<M: Entity> Repository<M> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            descriptor: M::descriptor(),
            _model: PhantomData,
        }
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    /// Connection the repository is bound to.
    pub fn connection_id(&self) -> Uuid {
        self.store.connection_id()
    }

    /// Lazy query over matching entities.
    ///
    /// Order fields are checked against the declared field set before any
    /// query runs.
    pub fn find(&self, filters: Vec<Filter>, order_by: Option<&[OrderBy]>) -> AppResult<FindQuery<M>> {
        let sort = order_by.unwrap_or_default();
        if let Some(unknown) = sort.iter().find(|o| !self.descriptor.has_field(&o.field_name)) {
            return Err(AppError::UnknownOrderField {
                field: unknown.field_name.clone(),
                entity: self.descriptor.name,
            });
        }

        Ok(FindQuery {
            store: self.store.clone(),
            descriptor: self.descriptor,
            options: FindOptions {
                filters,
                sort: sort.to_vec(),
                skip: 0,
                limit: None,
            },
            _model: PhantomData,
        })
    }

    pub fn get_all(&self) -> FindQuery<M> {
        FindQuery {
            store: self.store.clone(),
            descriptor: self.descriptor,
            options: FindOptions::default(),
            _model: PhantomData,
        }
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Option<M>> {
        self.find(vec![Filter::id(id)], None)?.first_or_none().await
    }

    pub async fn create(&self, item: impl Into<EntityInput<M>>) -> AppResult<M> {
        let mut model = self.coerce(item.into())?;
        let id = self
            .store
            .insert_one(self.descriptor.collection, self.to_document(&model)?)
            .await?;
        model.set_id(id);
        debug!("Created {} {}", self.descriptor.name, id);
        Ok(model)
    }

    /// Coerce each item independently and insert the valid ones as one batch.
    pub async fn create_many<I>(&self, items: I) -> AppResult<BatchInsert<M>>
    where
        I: IntoIterator,
        I::Item: Into<EntityInput<M>>,
    {
        let mut models = Vec::new();
        let mut skipped = 0;
        for item in items {
            match self.coerce(item.into()) {
                Ok(model) => models.push(model),
                Err(e) => {
                    warn!("Skipping {} in batch insert: {}", self.descriptor.name, e);
                    skipped += 1;
                }
            }
        }

        if models.is_empty() {
            return Ok(BatchInsert {
                inserted: models,
                skipped,
            });
        }

        let bodies = models
            .iter()
            .map(|m| self.to_document(m))
            .collect::<AppResult<Vec<_>>>()?;
        let ids = self
            .store
            .insert_many(self.descriptor.collection, bodies)
            .await?;

        for (model, id) in models.iter_mut().zip(ids) {
            model.set_id(id);
        }
        debug!("Inserted {} {} documents", models.len(), self.descriptor.name);

        Ok(BatchInsert {
            inserted: models,
            skipped,
        })
    }

    /// Replace the stored entity. An explicit `id` wins over one on the input.
    pub async fn update(&self, item: impl Into<EntityInput<M>>, id: Option<Uuid>) -> AppResult<M> {
        let mut model = self.coerce(item.into())?;
        let id = id
            .or_else(|| model.id())
            .ok_or_else(|| AppError::MissingId(self.descriptor.name.to_string()))?;

        model.set_id(id);
        self.store
            .replace_one(self.descriptor.collection, id, self.to_document(&model)?)
            .await?;
        debug!("Updated {} {}", self.descriptor.name, id);
        Ok(model)
    }

    /// Delete by identifier. Returns whether a document was removed.
    pub async fn delete(&self, target: impl Into<DeleteTarget<M>>) -> AppResult<bool> {
        let id = match target.into() {
            DeleteTarget::Id(id) => id,
            DeleteTarget::Entity(model) => model
                .id()
                .ok_or_else(|| AppError::MissingId(self.descriptor.name.to_string()))?,
        };

        let removed = self.store.delete_one(self.descriptor.collection, id).await?;
        debug!("Deleted {} {}: {}", self.descriptor.name, id, removed);
        Ok(removed)
    }

    fn coerce(&self, input: EntityInput<M>) -> AppResult<M> {
        let value = match input {
            EntityInput::Model(model) => {
                return match model.validate() {
                    Ok(()) => Ok(model),
                    Err(errors) => {
                        let input = serde_json::to_value(&model).unwrap_or(Value::Null);
                        Err(self.validation_failed(input, FieldError::from_validation(&errors)))
                    }
                };
            }
            EntityInput::Data(data) => serde_json::to_value(data)
                .map_err(|e| AppError::internal(format!("Serialization failed: {}", e)))?,
            EntityInput::Raw(raw) => Value::Object(raw),
        };

        let model: M = match serde_json::from_value(value.clone()) {
            Ok(model) => model,
            Err(e) => return Err(self.validation_failed(value, vec![FieldError::from_serde(&e)])),
        };
        if let Err(errors) = model.validate() {
            return Err(self.validation_failed(value, FieldError::from_validation(&errors)));
        }

        Ok(model)
    }

    fn validation_failed(&self, input: Value, errors: Vec<FieldError>) -> AppError {
        AppError::ValidationFailed {
            input,
            target: self.descriptor.name,
            errors,
        }
    }

    /// Serialized body without the identifier, which the store keeps apart.
    fn to_document(&self, model: &M) -> AppResult<Document> {
        match serde_json::to_value(model) {
            Ok(Value::Object(mut body)) => {
                body.remove(ID_FIELD);
                Ok(body)
            }
            Ok(_) => Err(AppError::internal(format!(
                "{} does not serialize to an object",
                self.descriptor.name
            ))),
            Err(e) => Err(AppError::internal(format!("Serialization failed: {}", e))),
        }
    }
}

/// Query built by [`Repository::find`]; nothing runs until a terminal call.
pub struct FindQuery<M: Entity> {
    store: Arc<dyn DocumentStore>,
    descriptor: &'static EntityDescriptor,
    options: FindOptions,
    _model: PhantomData<fn() -> M>,
}

impl<M: Entity> FindQuery<M> {
    pub fn skip(mut self, skip: u64) -> Self {
        self.options.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.options.limit = Some(limit);
        self
    }

    pub async fn to_list(self) -> AppResult<Vec<M>> {
        let documents = self
            .store
            .find(self.descriptor.collection, self.options)
            .await?;

        documents
            .into_iter()
            .map(|doc| decode(self.descriptor, doc))
            .collect()
    }

    pub async fn first_or_none(self) -> AppResult<Option<M>> {
        Ok(self.limit(1).to_list().await?.into_iter().next())
    }

    /// Count of matching documents, ignoring skip and limit.
    pub async fn count(&self) -> AppResult<u64> {
        self.store
            .count(self.descriptor.collection, self.options.filters.clone())
            .await
    }
}

fn decode<M: Entity>(descriptor: &EntityDescriptor, doc: StoredDocument) -> AppResult<M> {
    let id = doc.id;
    serde_json::from_value(doc.into_value()).map_err(|e| {
        AppError::internal(format!(
            "Stored {} {} cannot be decoded: {}",
            descriptor.name, id, e
        ))
    })
}
