//! Application state for dependency injection.

use std::sync::Arc;

use auth_service_lib::AuthService;
use document_service_lib::{ImportService, JobListingService, RepositoryRegistry};

use crate::config::GatewayConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthService>,
    pub listings: Arc<dyn JobListingService>,
    pub imports: ImportService,
    pub registry: Arc<RepositoryRegistry>,
    pub config: GatewayConfig,
}

impl AppState {
    /// Create new app state.
    pub fn new(
        auth: Arc<dyn AuthService>,
        listings: Arc<dyn JobListingService>,
        imports: ImportService,
        registry: Arc<RepositoryRegistry>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            auth,
            listings,
            imports,
            registry,
            config,
        }
    }
}
