//! pulse-ingest library - Campaign event ingestion and analytics service
//!
//! Accepts heterogeneous campaign event data from three producers (a signed
//! webhook, a file-batch upload, a generic automation callback), normalizes
//! it into canonical records, persists it, and derives aggregate metrics and
//! rule-based insights.

use axum::Router;
use pulse_common::config::ServiceConfig;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub mod aggregate;
pub mod api;
pub mod error;
pub mod insight;
pub mod normalize;
pub mod scheduler;
pub mod store;

pub use crate::error::{ApiError, ApiResult};
pub use crate::store::Store;

/// Application state shared across HTTP handlers
///
/// The store handle is created once at startup and threaded through
/// request-scoped handlers; there is no ambient global client.
#[derive(Clone)]
pub struct AppState {
    /// Durable store access with bounded per-operation timeouts
    pub store: Store,
    /// Service configuration resolved at startup
    pub config: Arc<ServiceConfig>,
    /// Run-in-progress guard for the periodic insight job
    pub insight_running: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(store: Store, config: ServiceConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            insight_running: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::webhook_routes())
        .merge(api::data_routes())
        .merge(api::automation_routes())
        .merge(api::analytics_routes())
        .with_state(state)
}
