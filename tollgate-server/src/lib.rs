//! HTTP API and configuration for the Tollgate license server.
//!
//! Admin routes live under `/admin` and require the control API secret. The
//! public `/license/verify` route answers whether a token is a valid, active
//! license signed by the key it names.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tollgate_license::LicenseService;
use tollgate_storage::{open_store, StorageError};

pub use config::{ConfigError, ServerConfig};
pub use error::{status_of, ApiError, ErrorBody};
pub use handlers::{IssuedLicense, MessageBody, UploadedKey, VerifyResponse};

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: LicenseService,
    pub control_api_secret: Arc<str>,
}

impl AppState {
    pub fn new(service: LicenseService, control_api_secret: &str) -> Self {
        Self {
            service,
            control_api_secret: Arc::from(control_api_secret),
        }
    }
}

/// Opens the configured store and wires the license service over it.
pub async fn build_service(config: &ServerConfig) -> Result<LicenseService, StorageError> {
    let stores = open_store(&config.store).await?;
    let service = LicenseService::new(&stores, config.master_key(), Arc::new(config.catalog()))
        .with_store_timeout(config.store_timeout());
    Ok(service)
}

/// Build the HTTP API router over the given state.
pub fn build_router(state: AppState) -> Router {
    let admin = Router::new()
        .route(
            "/licenses",
            post(handlers::generate_license).get(handlers::list_licenses),
        )
        .route(
            "/licenses/{id}",
            get(handlers::get_license).delete(handlers::delete_license),
        )
        .route("/licenses/{id}/activate", put(handlers::activate_license))
        .route("/licenses/{id}/inactivate", put(handlers::inactivate_license))
        .route("/keys", post(handlers::upload_key).get(handlers::list_keys))
        .route(
            "/keys/{id}",
            get(handlers::key_info).delete(handlers::delete_key),
        )
        .route("/products", get(handlers::list_products))
        .route("/products/{name}", get(handlers::get_product))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .nest("/admin", admin)
        .route("/license/verify", post(handlers::verify_license))
        .route("/license/ping", post(handlers::ping))
        .with_state(state)
}
