//! API Gateway Library
//!
//! HTTP surface of the job board: registration and login, user profiles,
//! listing pages, shortlists and CSV uploads. Handlers call the auth and
//! document services in-process.

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use auth_service_lib::{AuthServiceConfig, Authenticator};
use common::AppResult;
use document_service_lib::{
    connector_for, ImportService, ImportWorker, JobListingManager, RepositoryRegistry,
};

use crate::config::GatewayConfig;
use crate::routes::create_router;
use crate::state::AppState;

/// Pending import jobs before uploads start waiting
const IMPORT_QUEUE_CAPACITY: usize = 16;

/// Wire services together and start the import worker.
///
/// The worker gets its own registry on the same connector, so it never shares
/// cached repositories with request handling.
pub async fn build_state(
    config: GatewayConfig,
    auth_config: AuthServiceConfig,
) -> AppResult<(AppState, JoinHandle<()>)> {
    let connector = connector_for(config.store_backend);

    let registry = Arc::new(RepositoryRegistry::new(connector.clone()));
    registry.setup().await?;

    let worker_registry = Arc::new(RepositoryRegistry::new(connector));
    let (jobs_tx, jobs_rx) = mpsc::channel(IMPORT_QUEUE_CAPACITY);
    let worker = ImportWorker::new(worker_registry, jobs_rx).spawn();

    let auth = Arc::new(Authenticator::new(registry.clone(), auth_config));
    let listings = Arc::new(JobListingManager::new(
        registry.clone(),
        config.max_items_per_page,
    ));
    let imports = ImportService::new(config.import.clone(), jobs_tx);

    let state = AppState::new(auth, listings, imports, registry, config);
    Ok((state, worker))
}

/// Run the HTTP server until it fails.
pub async fn run_server(
    host: &str,
    port: u16,
    config: GatewayConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let auth_config = AuthServiceConfig::from_env()?;
    let (state, _worker) = build_state(config, auth_config).await?;
    let registry = state.registry.clone();

    let app = create_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    registry.teardown().await?;
    Ok(())
}
