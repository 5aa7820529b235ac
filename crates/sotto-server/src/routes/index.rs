//! Index route group: service identity and health.

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use serde::Serialize;

use crate::health;
use crate::server::AppState;

/// Routes mounted at the base path.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
}

/// Identity payload for `GET /`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    /// Service name.
    pub name: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Short model name.
    pub model: &'static str,
    /// Always `"ok"`.
    pub status: &'static str,
}

/// GET /
async fn index_handler() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "sotto",
        version: env!("CARGO_PKG_VERSION"),
        model: sotto_transcription::model::MODEL_NAME,
        status: "ok",
    })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<health::HealthResponse> {
    Json(health::health_check(state.start_time, state.engine.is_some()))
}
