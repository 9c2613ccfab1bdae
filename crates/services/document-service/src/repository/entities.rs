//! Concrete repositories, one per entity type.

use std::ops::Deref;
use std::sync::Arc;

use uuid::Uuid;

use common::AppResult;
use domain::{Entity, JobListing, ShortlistedListing, User};

use super::base::Repository;
use crate::infra::{DocumentStore, Filter};

/// A repository type the registry can build and cache.
pub trait RepositoryType: Send + Sync + Sized + 'static {
    /// Cache key, unique per repository type.
    const NAME: &'static str;

    type Model: Entity;

    fn build(store: Arc<dyn DocumentStore>) -> Self;

    fn repository(&self) -> &Repository<Self::Model>;
}

macro_rules! repository_type {
    ($name:ident, $model:ty) => {
        #[derive(Clone)]
        pub struct $name(Repository<$model>);

        impl RepositoryType for $name {
            const NAME: &'static str = stringify!($name);
            type Model = $model;

            fn build(store: Arc<dyn DocumentStore>) -> Self {
                Self(Repository::new(store))
            }

            fn repository(&self) -> &Repository<$model> {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = Repository<$model>;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

repository_type!(UserRepository, User);
repository_type!(JobListingRepository, JobListing);
repository_type!(ShortlistRepository, ShortlistedListing);

impl UserRepository {
    pub async fn fetch_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.find(vec![Filter::eq("username", username)], None)?
            .first_or_none()
            .await
    }

    pub async fn fetch_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.find(vec![Filter::eq("email", email)], None)?
            .first_or_none()
            .await
    }

    /// One identifier matched against both username and email.
    pub async fn fetch_by_username_or_email(&self, identifier: &str) -> AppResult<Option<User>> {
        let filter = Filter::Or(vec![
            Filter::eq("username", identifier),
            Filter::eq("email", identifier),
        ]);
        self.find(vec![filter], None)?.first_or_none().await
    }
}

impl ShortlistRepository {
    pub async fn fetch_for_user(&self, user_id: Uuid) -> AppResult<Vec<ShortlistedListing>> {
        self.find(vec![Filter::eq("user_id", user_id.to_string())], None)?
            .to_list()
            .await
    }

    pub async fn fetch_entry(
        &self,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> AppResult<Option<ShortlistedListing>> {
        let filters = vec![
            Filter::eq("user_id", user_id.to_string()),
            Filter::eq("listing_id", listing_id.to_string()),
        ];
        self.find(filters, None)?.first_or_none().await
    }
}
