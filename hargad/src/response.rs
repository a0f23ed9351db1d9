//! Assembles the prediction response from the raw price and model
//! introspection data.

use crate::api::models::predict::{FeatureImportance, PredictionResponse};
use crate::config::ResponseConfig;
use crate::model::artifacts::Model;
use chrono::{SecondsFormat, Utc};
use std::time::Instant;

/// Human-readable labels for the model's recorded importance scores, in the
/// order the training pipeline records them.
const IMPORTANCE_LABELS: [&str; 5] = [
    "Square footage (LB)",
    "Location",
    "Number of bathrooms",
    "Land area (LT)",
    "Number of bedrooms",
];

const TOP_IMPORTANCES: usize = 3;

/// Build a [`PredictionResponse`] from a clamped raw price.
///
/// `started` is the instant the request entered the pipeline; elapsed time is
/// measured against it after the model has run.
pub fn assemble(
    price: f64,
    model: &Model,
    started: Instant,
    config: &ResponseConfig,
) -> PredictionResponse {
    let prediction = round2(price);

    let band = config.price_range_pct;
    let price_range = (round2(prediction * (1.0 - band)), round2(prediction * (1.0 + band)));

    let confidence_score = model.confidence().unwrap_or(config.default_confidence);

    let feature_importance = model.feature_importances().map(top_importances);

    let prediction_time_ms = started.elapsed().as_secs_f64() * 1000.0;

    PredictionResponse {
        prediction,
        prediction_time: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        confidence_score: Some(confidence_score),
        price_range: Some(price_range),
        model_name: Some(model.name().to_string()),
        feature_importance,
        prediction_time_ms: Some(prediction_time_ms),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Label the scores, sort descending, keep the top 3.
fn top_importances(scores: &[f64]) -> Vec<FeatureImportance> {
    let mut labelled: Vec<FeatureImportance> = IMPORTANCE_LABELS
        .iter()
        .zip(scores)
        .map(|(label, score)| FeatureImportance {
            label: (*label).to_string(),
            score: *score,
        })
        .collect();
    labelled.sort_by(|a, b| b.score.total_cmp(&a.score));
    labelled.truncate(TOP_IMPORTANCES);
    labelled
}
