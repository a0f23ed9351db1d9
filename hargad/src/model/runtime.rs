//! Lazy, once-per-process loading of the fitted artifacts, and the
//! transform-then-predict entry point.
//!
//! The uninitialized → loaded transition is guarded by a
//! [`tokio::sync::OnceCell`]: at most one load attempt runs at a time,
//! concurrent first callers wait for it, a failed attempt leaves the cell
//! uninitialized so a later request can retry, and a successful load is
//! shared read-only for the process lifetime.

use crate::errors::{ArtifactKind, Error, Result};
use crate::features::FeatureRow;
use crate::model::artifacts::{Model, Preprocessor, normalize_model_name, resolve_interaction};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Read access to persisted artifact bytes.
///
/// The production implementation is the local filesystem; tests substitute
/// in-memory stores to count loads and to inject corrupt artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync + 'static {
    async fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// Filesystem-backed [`ArtifactStore`].
#[derive(Debug, Default)]
pub struct FsStore;

#[async_trait]
impl ArtifactStore for FsStore {
    async fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}

/// Candidate locations for one artifact, in precedence order: explicit
/// override, bundled default, repository-level fallback. The first location
/// that exists wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathChain {
    candidates: Vec<PathBuf>,
}

impl PathChain {
    pub fn new(override_path: Option<PathBuf>, bundled: PathBuf, fallback: PathBuf) -> Self {
        let mut candidates = Vec::with_capacity(3);
        if let Some(p) = override_path {
            candidates.push(p);
        }
        candidates.push(bundled);
        candidates.push(fallback);
        Self { candidates }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }
}

/// Resolved candidate chains for the two artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub preprocessor: PathChain,
    pub model: PathChain,
}

/// The fully-loaded artifact pair. Never mutated after load.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub preprocessor: Preprocessor,
    pub model: Model,
}

/// Process-wide model runtime. Shared behind an `Arc` in application state.
pub struct ModelRuntime {
    store: Arc<dyn ArtifactStore>,
    paths: ArtifactPaths,
    cell: OnceCell<Artifacts>,
}

impl ModelRuntime {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self::with_store(paths, Arc::new(FsStore))
    }

    pub fn with_store(paths: ArtifactPaths, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            paths,
            cell: OnceCell::new(),
        }
    }

    /// Load both artifacts if not already loaded. Idempotent; concurrent
    /// callers share a single load attempt.
    pub async fn ensure_loaded(&self) -> Result<&Artifacts> {
        self.cell
            .get_or_try_init(|| load_artifacts(self.store.as_ref(), &self.paths))
            .await
    }

    /// Whether the artifact pair has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Transform the row and predict a price, clamped to be non-negative.
    ///
    /// A learned regressor may emit negative values for unseen extreme
    /// inputs; those are not physically meaningful prices.
    pub async fn predict(&self, row: &FeatureRow) -> Result<f64> {
        let artifacts = self.ensure_loaded().await?;
        let x = artifacts.preprocessor.transform(row)?;
        let y = artifacts.model.predict(&x)?;
        Ok(y.max(0.0))
    }
}

async fn load_artifacts(store: &dyn ArtifactStore, paths: &ArtifactPaths) -> Result<Artifacts> {
    let (preprocessor_path, preprocessor_bytes) =
        read_first_existing(store, ArtifactKind::Preprocessor, &paths.preprocessor).await?;
    let (model_path, model_bytes) =
        read_first_existing(store, ArtifactKind::Model, &paths.model).await?;

    let preprocessor: Preprocessor =
        serde_json::from_slice(&preprocessor_bytes).map_err(|e| Error::ArtifactLoad {
            kind: ArtifactKind::Preprocessor,
            path: preprocessor_path.clone(),
            source: e.into(),
        })?;
    if preprocessor.columns.is_empty() {
        return Err(Error::ArtifactLoad {
            kind: ArtifactKind::Preprocessor,
            path: preprocessor_path.clone(),
            source: anyhow::anyhow!("fitted column list is empty"),
        });
    }
    // Resolve the named transform now so an unknown name warns once at load,
    // not on every request.
    if let Some(name) = &preprocessor.interactions {
        let _ = resolve_interaction(name);
    }

    let mut model: Model =
        serde_json::from_slice(&model_bytes).map_err(|e| Error::ArtifactLoad {
            kind: ArtifactKind::Model,
            path: model_path.clone(),
            source: e.into(),
        })?;
    let normalized = normalize_model_name(model.name()).to_string();
    model.set_name(normalized);

    tracing::info!(
        preprocessor = %preprocessor_path.display(),
        model = %model_path.display(),
        model_name = model.name(),
        "Artifacts loaded"
    );

    Ok(Artifacts {
        preprocessor,
        model,
    })
}

async fn read_first_existing(
    store: &dyn ArtifactStore,
    kind: ArtifactKind,
    chain: &PathChain,
) -> Result<(PathBuf, Vec<u8>)> {
    for path in chain.candidates() {
        match store.read(path).await {
            Ok(bytes) => return Ok((path.clone(), bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(Error::ArtifactLoad {
                    kind,
                    path: path.clone(),
                    source: e.into(),
                });
            }
        }
    }
    Err(Error::ArtifactNotFound {
        kind,
        attempted: chain.candidates().to_vec(),
    })
}
