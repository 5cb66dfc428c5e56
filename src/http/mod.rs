//! HTTP host service that puts the admission controller in front of routes.

mod key;
mod middleware;
mod routes;
mod server;

use std::sync::Arc;

use axum::routing::{delete, get};
use axum::Router;

use crate::admission::AdmissionBackend;

pub use key::{resolve_client_key, ANONYMOUS_KEY, API_KEY_HEADER, SESSION_COOKIE};
pub use middleware::{
    admission_middleware, apply_quota_headers, guarded_check, RejectionBody, LIMIT_HEADER,
    REMAINING_HEADER, RESET_HEADER,
};
pub use server::HttpServer;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn AdmissionBackend>,
}

impl AppState {
    pub fn new(backend: Arc<dyn AdmissionBackend>) -> Self {
        Self { backend }
    }
}

/// Build the service router.
///
/// Only `/api/*` routes pass through admission control. Health and admin
/// routes never consume quota.
pub fn router(backend: Arc<dyn AdmissionBackend>) -> Router {
    let state = AppState::new(backend);

    let api = Router::new()
        .route("/api/ping", get(routes::ping))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            admission_middleware,
        ));

    let admin = Router::new()
        .route("/admin/stats", get(routes::stats))
        .route("/admin/keys", delete(routes::reset_all))
        .route("/admin/keys/:key", delete(routes::reset_key));

    Router::new()
        .route("/health", get(routes::health))
        .merge(api)
        .merge(admin)
        .with_state(state)
}
