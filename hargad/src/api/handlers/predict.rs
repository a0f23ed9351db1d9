use crate::AppState;
use crate::api::models::predict::{PredictionRequest, PredictionResponse};
use crate::errors::Error;
use crate::inference;
use axum::{Json, extract::State};

// POST /predict - run the inference pipeline on one request
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictionRequest>,
) -> Result<Json<PredictionResponse>, Error> {
    let response =
        inference::predict_price(&state.runtime, &state.config.response, request).await?;
    Ok(Json(response))
}
