//! Paginated, filtered views over one repository type.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use common::{max_items_per_page, AppResult, OptionExt};
use domain::{Entity, OrderBy};

use crate::infra::Filter;
use crate::repository::{RepositoryRegistry, RepositoryType};

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Effective page number (1-based)
    pub page: u64,
    /// Effective page size
    pub size: u64,
    /// Total matches, ignoring pagination
    pub element_count: u64,
    pub items: Vec<T>,
}

pub struct DocumentService<R: RepositoryType> {
    registry: Arc<RepositoryRegistry>,
    max_per_page: u64,
    _repository: PhantomData<fn() -> R>,
}

impl<R: RepositoryType> Clone for DocumentService<R> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            max_per_page: self.max_per_page,
            _repository: PhantomData,
        }
    }
}

impl<R: RepositoryType> DocumentService<R> {
    pub fn new(registry: Arc<RepositoryRegistry>, max_per_page: u64) -> Self {
        Self {
            registry,
            max_per_page: max_per_page.max(1),
            _repository: PhantomData,
        }
    }

    /// Service with the page ceiling from `MAX_ITEMS_PER_PAGE`.
    pub fn from_env(registry: Arc<RepositoryRegistry>) -> AppResult<Self> {
        Ok(Self::new(registry, max_items_per_page()?))
    }

    pub fn max_per_page(&self) -> u64 {
        self.max_per_page
    }

    pub fn registry(&self) -> &Arc<RepositoryRegistry> {
        &self.registry
    }

    async fn repository(&self) -> AppResult<Arc<R>> {
        self.registry.repository::<R>().await
    }

    /// Page `page` of size `size`, both clamped into range.
    ///
    /// Without `order_by` the entity's default ordering applies. Pages past
    /// the end come back empty.
    pub async fn get_page(
        &self,
        page: i64,
        size: i64,
        filters: Vec<Filter>,
        order_by: Option<Vec<OrderBy>>,
    ) -> AppResult<Page<R::Model>> {
        let page = page.max(1) as u64;
        let size = size.clamp(1, i64::try_from(self.max_per_page).unwrap_or(i64::MAX)) as u64;
        let order_by =
            order_by.unwrap_or_else(|| <R::Model as Entity>::descriptor().default_ordering());

        let repository = self.repository().await?;
        let query = repository.repository().find(filters, Some(&order_by))?;
        let element_count = query.count().await?;
        let items = query
            .skip((page - 1).saturating_mul(size))
            .limit(size)
            .to_list()
            .await?;

        Ok(Page {
            page,
            size,
            element_count,
            items,
        })
    }

    pub async fn element_count(&self, filters: Vec<Filter>) -> AppResult<u64> {
        let repository = self.repository().await?;
        repository.repository().find(filters, None)?.count().await
    }

    /// Entity with `id`, or a not-found error naming the entity type.
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<R::Model> {
        let repository = self.repository().await?;
        repository
            .repository()
            .get_by_id(id)
            .await?
            .ok_or_not_found(<R::Model as Entity>::descriptor().name, id)
    }
}
