//! Shared test fixtures: fitted artifact builders, an in-memory counting
//! artifact store, and on-disk artifact directories.

use crate::api::models::predict::PredictionRequest;
use crate::features;
use crate::model::artifacts::{
    CategoryEncoder, LinearModel, Model, NumericScaler, Preprocessor,
};
use crate::model::runtime::{ArtifactPaths, ArtifactStore, PathChain};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// The canonical valid request used across tests.
pub fn sample_request() -> PredictionRequest {
    PredictionRequest {
        building_area: 120.0,
        land_area: 150.0,
        bathroom_count: 2,
        bedroom_count: 3,
        city_or_regency: "Bandung".to_string(),
        province: "Jawa Barat".to_string(),
        property_type: "rumah".to_string(),
        price_per_sqm: None,
        building_to_land_ratio: None,
    }
}

/// A fitted preprocessor over the full 13-column row: identity scaling for
/// the ten numeric columns (so transformed values are easy to assert on) and
/// small category tables for the three categorical columns.
pub fn fitted_preprocessor() -> Preprocessor {
    let numeric_columns = [
        "building_area",
        "land_area",
        "bathroom_count",
        "bedroom_count",
        "area_product",
        "log_building_area",
        "log_land_area",
        "building_area_x_bathrooms",
        "land_area_x_bedrooms",
        "building_to_land_area_ratio",
    ];
    let numeric = numeric_columns
        .iter()
        .map(|column| NumericScaler {
            column: (*column).to_string(),
            mean: 0.0,
            std: 1.0,
            fill: if *column == "building_to_land_area_ratio" {
                0.8
            } else {
                0.0
            },
        })
        .collect();

    let categorical = vec![
        CategoryEncoder {
            column: "city_or_regency".to_string(),
            categories: vec![
                "Bandung".to_string(),
                "Jakarta Selatan".to_string(),
                "Surabaya".to_string(),
            ],
        },
        CategoryEncoder {
            column: "province".to_string(),
            categories: vec![
                "Jawa Barat".to_string(),
                "DKI Jakarta".to_string(),
                "Jawa Timur".to_string(),
            ],
        },
        CategoryEncoder {
            column: "property_type".to_string(),
            categories: vec!["rumah".to_string(), "apartemen".to_string()],
        },
    ];

    Preprocessor {
        schema_version: 1,
        columns: features::COLUMNS.iter().map(|c| (*c).to_string()).collect(),
        numeric,
        categorical,
        interactions: Some("make_interactions_v1".to_string()),
    }
}

/// A model that predicts a fixed value for any input: zero coefficients over
/// the fixture preprocessor's output, plus the value as intercept.
pub fn constant_model(value: f64) -> Model {
    Model::Linear(LinearModel {
        name: "Linear".to_string(),
        coefficients: vec![0.0; fitted_preprocessor().output_len()],
        intercept: value,
    })
}

/// Candidate chains matching the paths [`CountingStore`] serves artifacts at.
pub fn test_paths() -> ArtifactPaths {
    ArtifactPaths {
        preprocessor: PathChain::new(
            None,
            PathBuf::from("hargad/models/trained/preprocessor.json"),
            PathBuf::from("models/trained/preprocessor.json"),
        ),
        model: PathChain::new(
            None,
            PathBuf::from("hargad/models/trained/house_price_best.json"),
            PathBuf::from("models/trained/house_price_best.json"),
        ),
    }
}

/// In-memory [`ArtifactStore`] that counts reads and can fail on demand.
pub struct CountingStore {
    pub reads: Arc<AtomicUsize>,
    /// When set, the next read fails with a permission error and clears
    /// the flag.
    pub fail_next: Arc<AtomicBool>,
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl CountingStore {
    pub fn empty() -> Self {
        Self {
            reads: Arc::new(AtomicUsize::new(0)),
            fail_next: Arc::new(AtomicBool::new(false)),
            files: Mutex::new(HashMap::new()),
        }
    }

    /// A store serving the given artifacts at the bundled locations of
    /// [`test_paths`].
    pub fn with_artifacts(preprocessor: &Preprocessor, model: &Model) -> Self {
        let store = Self::empty();
        {
            let mut files = store.files.lock().unwrap();
            files.insert(
                PathBuf::from("hargad/models/trained/preprocessor.json"),
                serde_json::to_vec(preprocessor).expect("serialize preprocessor"),
            );
            files.insert(
                PathBuf::from("hargad/models/trained/house_price_best.json"),
                serde_json::to_vec(model).expect("serialize model"),
            );
        }
        store
    }

    /// Replace the model artifact bytes with non-JSON garbage.
    pub fn corrupt_model(&self) {
        self.files.lock().unwrap().insert(
            PathBuf::from("hargad/models/trained/house_price_best.json"),
            b"not json at all".to_vec(),
        );
    }
}

#[async_trait]
impl ArtifactStore for CountingStore {
    async fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "injected failure",
            ));
        }
        match self.files.lock().unwrap().get(path) {
            Some(bytes) => {
                self.reads.fetch_add(1, Ordering::SeqCst);
                Ok(bytes.clone())
            }
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no artifact at {}", path.display()),
            )),
        }
    }
}
