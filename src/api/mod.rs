pub mod error;
pub mod health;
pub mod response;
pub mod v1;

use axum::{http::StatusCode, routing::get, Router};
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::ServerConfig, ml::EnergyPredictor};

/// Shared, read-only state of the HTTP server
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<EnergyPredictor>,
}

pub fn router(state: AppState, cfg: &ServerConfig) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .nest("/api/v1", v1::router())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(cfg.request_timeout_secs),
                )),
        )
        .layer(TraceLayer::new_for_http())
}
