//! Persisted, previously-fitted artifacts: the preprocessing transformer and
//! the regression model.
//!
//! Both are serde JSON documents produced by the training pipeline and
//! deserialized back into callable objects at runtime. The preprocessor
//! records the exact column list it was fitted against and refuses to
//! transform a row that differs in set or order.

use crate::errors::{Error, PredictionStage, Result};
use crate::features::{FeatureRow, Value};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An interaction transform applied to the row before encoding.
///
/// Fitted preprocessors reference these by name so that artifacts persisted
/// against an older revision of the feature logic stay loadable.
pub type InteractionFn = fn(&mut FeatureRow);

/// Recompute the area interaction from its inputs. This is the original
/// training-time transform and the safe default for unknown names.
fn make_interactions_v1(row: &mut FeatureRow) {
    if let (Some(building), Some(land)) = (
        row.get("building_area").and_then(Value::as_number),
        row.get("land_area").and_then(Value::as_number),
    ) {
        row.set("area_product", Value::Number(building * land));
    }
}

static INTERACTION_REGISTRY: Lazy<HashMap<&'static str, InteractionFn>> = Lazy::new(|| {
    let mut registry: HashMap<&'static str, InteractionFn> = HashMap::new();
    registry.insert("make_interactions_v1", make_interactions_v1);
    // Pre-versioning artifacts used the bare name
    registry.insert("make_interactions", make_interactions_v1);
    registry
});

/// Resolve a named interaction transform, substituting the default when the
/// name is unknown so older artifacts remain loadable without re-training.
pub fn resolve_interaction(name: &str) -> InteractionFn {
    match INTERACTION_REGISTRY.get(name) {
        Some(f) => *f,
        None => {
            tracing::warn!(
                transform = name,
                "unknown interaction transform in preprocessor artifact; using default"
            );
            make_interactions_v1
        }
    }
}

/// Z-score scaling parameters for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericScaler {
    pub column: String,
    pub mean: f64,
    pub std: f64,
    /// Imputation value substituted for the missing-value marker.
    pub fill: f64,
}

/// One-hot encoding table for one categorical column. Unknown categories
/// encode as all zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    pub column: String,
    pub categories: Vec<String>,
}

/// A fitted preprocessing transformer: impute, scale, one-hot encode.
///
/// The output vector is the scaled numerics in column order followed by the
/// one-hot blocks in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub schema_version: u32,
    /// The exact ordered column set this transformer was fitted against.
    pub columns: Vec<String>,
    pub numeric: Vec<NumericScaler>,
    pub categorical: Vec<CategoryEncoder>,
    /// Named interaction transform applied before encoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactions: Option<String>,
}

impl Preprocessor {
    /// Dimensionality of the transformed feature vector.
    pub fn output_len(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.categories.len()).sum::<usize>()
    }

    /// Transform a feature row into the numeric vector the model expects.
    ///
    /// Fails with [`Error::FeatureMismatch`] when the row's column set or
    /// order differs from what this transformer was fitted against.
    pub fn transform(&self, row: &FeatureRow) -> Result<Vec<f64>> {
        let actual: Vec<String> = row.columns().map(str::to_string).collect();
        if actual != self.columns {
            return Err(Error::FeatureMismatch {
                expected: self.columns.clone(),
                actual,
            });
        }

        let mut row = row.clone();
        if let Some(name) = &self.interactions {
            resolve_interaction(name)(&mut row);
        }

        let mut out = Vec::with_capacity(self.output_len());

        for scaler in &self.numeric {
            let value = match row.get(&scaler.column) {
                Some(Value::Number(n)) if n.is_finite() => *n,
                Some(Value::Missing) => scaler.fill,
                Some(other) => {
                    return Err(Error::prediction(
                        PredictionStage::Transform,
                        format!("column {} has unsupported value {other:?}", scaler.column),
                    ));
                }
                None => {
                    return Err(Error::prediction(
                        PredictionStage::Transform,
                        format!("column {} absent from feature row", scaler.column),
                    ));
                }
            };
            // std of a constant training column is persisted as 0
            let std = if scaler.std > 0.0 { scaler.std } else { 1.0 };
            out.push((value - scaler.mean) / std);
        }

        for encoder in &self.categorical {
            let label = match row.get(&encoder.column) {
                Some(Value::Text(s)) => Some(s.clone()),
                Some(Value::Missing) | None => None,
                Some(other) => {
                    return Err(Error::prediction(
                        PredictionStage::Transform,
                        format!("column {} is not categorical: {other:?}", encoder.column),
                    ));
                }
            };
            for category in &encoder.categories {
                let hit = label.as_deref() == Some(category.as_str());
                out.push(if hit { 1.0 } else { 0.0 });
            }
        }

        Ok(out)
    }
}

/// One node of a regression tree, arena-indexed within its tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Branch {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A single regression tree. Evaluation starts at node 0; samples with a
/// feature value `<= threshold` descend left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    fn evaluate(&self, x: &[f64]) -> Result<f64> {
        let mut index = 0usize;
        // A well-formed tree terminates within nodes.len() steps
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(index) {
                Some(Node::Leaf { value }) => return Ok(*value),
                Some(Node::Branch {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = x.get(*feature).copied().ok_or_else(|| {
                        Error::prediction(
                            PredictionStage::Predict,
                            format!(
                                "tree references feature {feature} but input has {} features",
                                x.len()
                            ),
                        )
                    })?;
                    index = if value <= *threshold { *left } else { *right };
                }
                None => {
                    return Err(Error::prediction(
                        PredictionStage::Predict,
                        format!("tree node index {index} out of bounds"),
                    ));
                }
            }
        }
        Err(Error::prediction(
            PredictionStage::Predict,
            "tree evaluation did not reach a leaf",
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub name: String,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsembleModel {
    pub name: String,
    pub base_score: f64,
    pub trees: Vec<Tree>,
    /// Per-feature importance scores recorded at training time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importances: Option<Vec<f64>>,
    /// Validation-derived confidence recorded at training time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// A fitted regression model mapping a numeric feature vector to a price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Model {
    Linear(LinearModel),
    TreeEnsemble(TreeEnsembleModel),
}

impl Model {
    pub fn predict(&self, x: &[f64]) -> Result<f64> {
        match self {
            Model::Linear(model) => {
                if x.len() != model.coefficients.len() {
                    return Err(Error::prediction(
                        PredictionStage::Predict,
                        format!(
                            "model expects {} features, got {}",
                            model.coefficients.len(),
                            x.len()
                        ),
                    ));
                }
                let dot: f64 = model
                    .coefficients
                    .iter()
                    .zip(x)
                    .map(|(c, v)| c * v)
                    .sum();
                Ok(model.intercept + dot)
            }
            Model::TreeEnsemble(model) => {
                let mut score = model.base_score;
                for tree in &model.trees {
                    score += tree.evaluate(x)?;
                }
                Ok(score)
            }
        }
    }

    /// Display name stored in the artifact, normalized at load time.
    pub fn name(&self) -> &str {
        match self {
            Model::Linear(m) => &m.name,
            Model::TreeEnsemble(m) => &m.name,
        }
    }

    pub fn set_name(&mut self, name: String) {
        match self {
            Model::Linear(m) => m.name = name,
            Model::TreeEnsemble(m) => m.name = name,
        }
    }

    /// The model's native confidence output, if this model type exposes one.
    pub fn confidence(&self) -> Option<f64> {
        match self {
            Model::Linear(_) => None,
            Model::TreeEnsemble(m) => m.confidence,
        }
    }

    /// Per-feature importances, if this model type exposes them.
    pub fn feature_importances(&self) -> Option<&[f64]> {
        match self {
            Model::Linear(_) => None,
            Model::TreeEnsemble(m) => m.feature_importances.as_deref(),
        }
    }
}

/// Normalize training-framework class names to display names.
pub fn normalize_model_name(name: &str) -> &str {
    match name {
        "XGBRegressor" => "XGBoost",
        "GradientBoostingRegressor" => "GradientBoosting",
        "RandomForestRegressor" => "RandomForest",
        other => other,
    }
}
