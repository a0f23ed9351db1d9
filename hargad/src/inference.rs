//! The inference pipeline: validate, derive features, predict, assemble.
//!
//! One linear pass per request. Validation runs before any artifact work so
//! an invalid request never pays the load cost, and every failure propagates
//! as a typed [`Error`](crate::errors::Error) for the HTTP layer to map.

use crate::api::models::predict::{PredictionRequest, PredictionResponse};
use crate::config::ResponseConfig;
use crate::errors::Result;
use crate::features;
use crate::model::runtime::ModelRuntime;
use crate::response;
use std::time::Instant;

/// Generate a house price prediction from a raw request.
pub async fn predict_price(
    runtime: &ModelRuntime,
    config: &ResponseConfig,
    mut request: PredictionRequest,
) -> Result<PredictionResponse> {
    let started = Instant::now();

    request.validate()?;
    let row = features::derive(&request);

    let price = runtime.predict(&row).await?;
    let artifacts = runtime.ensure_loaded().await?;

    Ok(response::assemble(price, &artifacts.model, started, config))
}
