use std::time::Duration;

use axum::{Json, Router, http::StatusCode, routing::get};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::debug;

use crate::{AppState, routes};

/// Full application router: public probe, gated API, and the shared layers.
pub fn create_app(state: AppState) -> Router {
    let timeout: Duration = state.config().limits.request_timeout;

    Router::new()
        .route(routes::paths::PING, get(ping_handler))
        .merge(routes::create_api_router(state.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .with_state(state)
}

async fn ping_handler() -> Json<Value> {
    debug!("ping");
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
