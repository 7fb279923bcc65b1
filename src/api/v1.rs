use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::{error::ApiError, response::ApiResponse, AppState};
use crate::{
    domain::RawRecord,
    ml::{ModelMetadata, PredictionOutcome},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict))
        .route("/model", get(get_model))
}

/// POST /api/v1/predict
pub async fn predict(
    State(st): State<AppState>,
    payload: Result<Json<RawRecord>, JsonRejection>,
) -> Result<Json<PredictionOutcome>, ApiError> {
    let Json(record) = payload?;
    let predicted = st.predictor.try_predict(&record)?;
    Ok(Json(PredictionOutcome::succeeded(predicted)))
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    #[serde(flatten)]
    pub metadata: ModelMetadata,
    /// Record-level features, before preprocessing
    pub input_features: Vec<String>,
}

/// GET /api/v1/model
pub async fn get_model(State(st): State<AppState>) -> impl IntoResponse {
    ApiResponse::success(ModelInfo {
        metadata: st.predictor.metadata().clone(),
        input_features: st.predictor.feature_names().to_vec(),
    })
}
