//! Repository registry: owns the store connection and repository instances.
//!
//! One registry is constructed at startup and shared through an `Arc`. It
//! connects lazily, keeps at most one repository instance per type for the
//! current connection and rebinds everything when credentials change.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use common::{AppResult, StoreCredentials};
use domain::{EntityDescriptor, ENTITY_TYPES};

use super::entities::RepositoryType;
use crate::infra::{DocumentStore, StoreConnector};

#[derive(Default)]
struct RegistryState {
    credentials: Option<StoreCredentials>,
    store: Option<Arc<dyn DocumentStore>>,
    instances: HashMap<&'static str, Arc<dyn Any + Send + Sync>>,
}

pub struct RepositoryRegistry {
    connector: Arc<dyn StoreConnector>,
    entity_types: &'static [&'static EntityDescriptor],
    state: RwLock<RegistryState>,
}

impl RepositoryRegistry {
    /// Registry reading credentials from the environment on first use.
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            connector,
            entity_types: ENTITY_TYPES,
            state: RwLock::new(RegistryState::default()),
        }
    }

    pub fn with_credentials(connector: Arc<dyn StoreConnector>, credentials: StoreCredentials) -> Self {
        Self {
            connector,
            entity_types: ENTITY_TYPES,
            state: RwLock::new(RegistryState {
                credentials: Some(credentials),
                ..Default::default()
            }),
        }
    }

    /// Cached instance of `R`, built on the current connection if absent or
    /// when `reset` is set.
    pub async fn get_repository<R: RepositoryType>(&self, reset: bool) -> AppResult<Arc<R>> {
        if !reset {
            let state = self.state.read().await;
            if let Some(repository) = cached::<R>(&state) {
                return Ok(repository);
            }
        }

        let mut state = self.state.write().await;
        if !reset {
            // Another task may have built it while we waited for the lock
            if let Some(repository) = cached::<R>(&state) {
                return Ok(repository);
            }
        }

        let store = self.ensure_store(&mut state).await?;
        let repository = Arc::new(R::build(store));
        state.instances.insert(R::NAME, repository.clone());
        debug!("Built repository {}", R::NAME);

        Ok(repository)
    }

    pub async fn repository<R: RepositoryType>(&self) -> AppResult<Arc<R>> {
        self.get_repository(false).await
    }

    /// Replace the credentials and drop every cached repository.
    ///
    /// With `create_client` the old connection is closed and a new one opened
    /// right away; otherwise the next access connects lazily.
    pub async fn set_db_credentials(
        &self,
        credentials: StoreCredentials,
        create_client: bool,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        info!("Store credentials replaced: {:?}", credentials);
        state.credentials = Some(credentials);
        state.instances.clear();

        if let Some(old) = state.store.take() {
            if let Err(e) = old.close().await {
                warn!("Closing previous store connection failed: {}", e);
            }
        }

        if create_client {
            self.ensure_store(&mut state).await?;
        }
        Ok(())
    }

    /// Connect eagerly at process start.
    pub async fn setup(&self) -> AppResult<()> {
        self.ping().await?;
        info!("Repository registry ready");
        Ok(())
    }

    /// Round-trip to the store, connecting if needed.
    pub async fn ping(&self) -> AppResult<()> {
        let store = {
            let mut state = self.state.write().await;
            self.ensure_store(&mut state).await?
        };
        store.ping().await
    }

    /// Close the connection and drop every cached repository.
    pub async fn teardown(&self) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.instances.clear();
        if let Some(store) = state.store.take() {
            store.close().await?;
            info!("Store connection {} closed", store.connection_id());
        }
        Ok(())
    }

    /// Identifier of the live connection, connecting if needed.
    pub async fn connection_id(&self) -> AppResult<Uuid> {
        let mut state = self.state.write().await;
        Ok(self.ensure_store(&mut state).await?.connection_id())
    }

    async fn ensure_store(&self, state: &mut RegistryState) -> AppResult<Arc<dyn DocumentStore>> {
        if let Some(store) = &state.store {
            return Ok(store.clone());
        }

        let credentials = match &state.credentials {
            Some(credentials) => credentials.clone(),
            None => {
                let credentials = StoreCredentials::from_env()?;
                state.credentials = Some(credentials.clone());
                credentials
            }
        };

        let store = self.connector.connect(&credentials).await?;
        for descriptor in self.entity_types {
            store.ensure_collection(descriptor).await?;
        }
        info!(
            "Store connection {} ready with {} collections",
            store.connection_id(),
            self.entity_types.len()
        );

        state.store = Some(store.clone());
        Ok(store)
    }
}

fn cached<R: RepositoryType>(state: &RegistryState) -> Option<Arc<R>> {
    state
        .instances
        .get(R::NAME)
        .cloned()
        .and_then(|instance| instance.downcast::<R>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{MemoryConnector, MockStoreConnector};
    use crate::repository::{JobListingRepository, UserRepository};

    fn credentials(db_name: &str) -> StoreCredentials {
        StoreCredentials {
            host: "localhost".into(),
            port: 5432,
            user: "test".into(),
            password: "test".into(),
            db_name: db_name.into(),
        }
    }

    fn registry() -> RepositoryRegistry {
        RepositoryRegistry::with_credentials(Arc::new(MemoryConnector::new()), credentials("jobs"))
    }

    #[tokio::test]
    async fn test_repository_instances_are_cached() {
        let registry = registry();
        let first = registry.repository::<UserRepository>().await.unwrap();
        let second = registry.repository::<UserRepository>().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_reset_builds_new_instance_on_same_connection() {
        let registry = registry();
        let first = registry.repository::<UserRepository>().await.unwrap();
        let reset = registry.get_repository::<UserRepository>(true).await.unwrap();

        assert!(!Arc::ptr_eq(&first, &reset));
        assert_eq!(first.connection_id(), reset.connection_id());
    }

    #[tokio::test]
    async fn test_distinct_types_get_distinct_instances() {
        let registry = registry();
        let users = registry.repository::<UserRepository>().await.unwrap();
        let listings = registry.repository::<JobListingRepository>().await.unwrap();

        assert_eq!(users.descriptor().name, "User");
        assert_eq!(listings.descriptor().name, "JobListing");
    }

    #[tokio::test]
    async fn test_credential_swap_rebinds_repositories() {
        let registry = registry();
        let before = registry.repository::<UserRepository>().await.unwrap();

        registry
            .set_db_credentials(credentials("other"), true)
            .await
            .unwrap();
        let after = registry.repository::<UserRepository>().await.unwrap();

        assert_ne!(before.connection_id(), after.connection_id());
        assert_eq!(registry.connection_id().await.unwrap(), after.connection_id());
        // The old handle was closed with its connection
        assert!(before.get_all().to_list().await.is_err());
    }

    #[tokio::test]
    async fn test_lazy_credential_swap_connects_on_next_access() {
        let mut connector = MockStoreConnector::new();
        connector.expect_connect().times(1).returning(|_| {
            let mut store = crate::infra::MockDocumentStore::new();
            let id = Uuid::new_v4();
            store.expect_connection_id().return_const(id);
            store.expect_ensure_collection().returning(|_| Ok(()));
            Ok(Arc::new(store))
        });

        let registry = RepositoryRegistry::new(Arc::new(connector));
        registry
            .set_db_credentials(credentials("jobs"), false)
            .await
            .unwrap();

        // Only now does the connector get called
        registry.repository::<UserRepository>().await.unwrap();
    }

    #[tokio::test]
    async fn test_teardown_drops_connection() {
        let registry = registry();
        let before = registry.connection_id().await.unwrap();
        registry.teardown().await.unwrap();

        let after = registry.connection_id().await.unwrap();
        assert_ne!(before, after);
    }
}
