use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use super::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    model_id: String,
}

/// GET /healthz
///
/// The predictor is loaded before the server binds, so a running server is
/// always able to serve predictions.
pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        model_id: state.predictor.metadata().model_id.clone(),
    };

    (StatusCode::OK, Json(response))
}
