//! Gateway configuration.

use common::{env_lookup, max_items_per_page, AppError, AppResult, ImportConfig, StoreBackend};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Which document store backs the repositories
    pub store_backend: StoreBackend,
    /// Pagination ceiling for listing pages
    pub max_items_per_page: u64,
    /// Largest accepted upload body
    pub max_upload_bytes: usize,
    pub import: ImportConfig,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            max_items_per_page: max_items_per_page()?,
            ..Self::from_lookup(env_lookup)?
        })
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let port = match lookup("GATEWAY_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AppError::config(format!("GATEWAY_PORT has an invalid value '{}'", raw)))?,
            None => DEFAULT_PORT,
        };
        let max_upload_bytes = match lookup("GATEWAY_MAX_UPLOAD_BYTES") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                AppError::config(format!("GATEWAY_MAX_UPLOAD_BYTES has an invalid value '{}'", raw))
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            host: lookup("GATEWAY_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            store_backend: StoreBackend::from_lookup(&lookup)?,
            max_items_per_page: common::parse_max_items_per_page(&lookup)?,
            max_upload_bytes,
            import: ImportConfig::from_lookup(&lookup)?,
        })
    }
}
