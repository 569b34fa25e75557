use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    Json,
};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::error::{ApiError, InferenceError};
use crate::model::handle::LoadOutcome;
use crate::preprocessing::features::PredictionRequest;
use crate::server::types::*;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::from_outcome(&state.outcome))
}

/// Parse, shape, score. The model is checked first so a failed startup
/// answers every call with the stored failure.
pub fn run_prediction(
    outcome: &LoadOutcome,
    body: &[u8],
) -> Result<PredictionResponse, InferenceError> {
    let model = outcome.model()?;
    let request = PredictionRequest::parse(body)?;
    let rows = request.to_rows(model.feature_names())?;
    let scores = model.score(rows.view())?;
    Ok(PredictionResponse::from_scores(scores, request.is_batch()))
}

/// Body read failures (over the size limit, broken stream) are answered with
/// the same JSON error shape as every other failure.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let start = Instant::now();
    let result = body
        .map_err(InferenceError::from)
        .and_then(|body| run_prediction(&state.outcome, &body));
    histogram!("predict_latency_seconds").record(start.elapsed().as_secs_f64());

    match result {
        Ok(response) => {
            counter!("predict_requests_total", "outcome" => "ok").increment(1);
            histogram!("predict_rows").record(response.rows() as f64);
            debug!(rows = response.rows(), "Prediction served");
            Ok(Json(response))
        }
        Err(err) => {
            let outcome = if err.status().is_client_error() {
                "client_error"
            } else {
                "server_error"
            };
            counter!("predict_requests_total", "outcome" => outcome).increment(1);
            debug!(error = %err, status = %err.status(), "Prediction rejected");
            Err(err.into_api_error(state.expose_details))
        }
    }
}
