use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error as ThisError;

/// Which persisted artifact an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Preprocessor,
    Model,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Preprocessor => write!(f, "preprocessor"),
            ArtifactKind::Model => write!(f, "model"),
        }
    }
}

/// Which stage of the inference pipeline a prediction failure occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionStage {
    Transform,
    Predict,
}

impl fmt::Display for PredictionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionStage::Transform => write!(f, "preprocessor transform"),
            PredictionStage::Predict => write!(f, "model predict"),
        }
    }
}

#[derive(ThisError, Debug)]
pub enum Error {
    /// Request fails schema constraints (missing/out-of-range field).
    /// Rejected before any model work; never retried automatically.
    #[error("{message}")]
    Validation { message: String },

    /// A required artifact file is absent at every configured location.
    /// Fatal for this process until configuration is fixed.
    #[error("{kind} artifact not found; attempted {}", format_paths(.attempted))]
    ArtifactNotFound {
        kind: ArtifactKind,
        attempted: Vec<PathBuf>,
    },

    /// Artifact file exists but fails to read or deserialize.
    #[error("failed to load {kind} artifact from {}", .path.display())]
    ArtifactLoad {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Derived feature columns do not match what the fitted preprocessor
    /// expects. Deployment skew between code and artifact; never coerced.
    #[error("feature columns do not match the fitted preprocessor (expected [{}], got [{}])",
            .expected.join(", "), .actual.join(", "))]
    FeatureMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// The transform or predict step failed for a reason other than the above.
    #[error("{stage} failed: {message}")]
    Prediction {
        stage: PredictionStage,
        message: String,
    },
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    pub fn prediction(stage: PredictionStage, message: impl Into<String>) -> Self {
        Error::Prediction {
            stage,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::ArtifactNotFound { .. }
            | Error::ArtifactLoad { .. }
            | Error::FeatureMismatch { .. }
            | Error::Prediction { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message identifying which stage failed,
    /// without leaking internal detail beyond the attempted paths.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { message } => message.clone(),
            Error::ArtifactNotFound { .. }
            | Error::ArtifactLoad { .. }
            | Error::FeatureMismatch { .. }
            | Error::Prediction { .. } => self.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details; level tiered by severity
        match &self {
            Error::Validation { .. } => {
                tracing::debug!("Client error: {}", self);
            }
            Error::ArtifactLoad { source, .. } => {
                tracing::error!("Artifact error: {}: {:#}", self, source);
            }
            Error::ArtifactNotFound { .. } => {
                tracing::error!("Artifact error: {}", self);
            }
            Error::FeatureMismatch { .. } => {
                tracing::error!("Deployment skew: {}", self);
            }
            Error::Prediction { .. } => {
                tracing::error!("Inference error: {}", self);
            }
        }

        let status = self.status_code();
        (status, self.user_message()).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
