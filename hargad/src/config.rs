//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The file path defaults to `config.yaml` but can be specified
//! via the `-f` flag or the `HARGAD_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Sources are merged in order (later sources override earlier ones):
//!
//! 1. **YAML config file** - base configuration (default: `config.yaml`)
//! 2. **Environment variables** - variables prefixed with `HARGAD_`
//!
//! For nested values, use double underscores: `HARGAD_ARTIFACTS__MODEL_PATH`
//! sets `artifacts.model_path`.
//!
//! ## Artifact locations
//!
//! Each artifact is resolved through a three-tier chain, first existing path
//! wins: the explicit override (`artifacts.preprocessor_path` /
//! `artifacts.model_path`), then the bundled directory
//! (`artifacts.bundled_dir`), then the repository-level fallback
//! (`artifacts.fallback_dir`).

use crate::model::runtime::{ArtifactPaths, PathChain};
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const PREPROCESSOR_FILE: &str = "preprocessor.json";
const MODEL_FILE: &str = "house_price_best.json";

/// Simple CLI args - just for specifying the config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "HARGAD_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Artifact location configuration
    pub artifacts: ArtifactsConfig,
    /// Response enrichment configuration
    pub response: ResponseConfig,
    /// CORS configuration
    pub cors: CorsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            artifacts: ArtifactsConfig::default(),
            response: ResponseConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

/// Where the fitted artifacts live.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactsConfig {
    /// Explicit preprocessor location; outranks both default directories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocessor_path: Option<PathBuf>,
    /// Explicit model location; outranks both default directories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
    /// Package-local artifact directory
    pub bundled_dir: PathBuf,
    /// Repository-level artifact directory
    pub fallback_dir: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            preprocessor_path: None,
            model_path: None,
            bundled_dir: PathBuf::from("hargad/models/trained"),
            fallback_dir: PathBuf::from("models/trained"),
        }
    }
}

impl ArtifactsConfig {
    /// Build the per-artifact candidate chains in precedence order.
    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            preprocessor: PathChain::new(
                self.preprocessor_path.clone(),
                self.bundled_dir.join(PREPROCESSOR_FILE),
                self.fallback_dir.join(PREPROCESSOR_FILE),
            ),
            model: PathChain::new(
                self.model_path.clone(),
                self.bundled_dir.join(MODEL_FILE),
                self.fallback_dir.join(MODEL_FILE),
            ),
        }
    }
}

/// Knobs for the optional response enrichment fields.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResponseConfig {
    /// Half-width of the reported price range, as a fraction of the
    /// prediction (0.10 = ±10%)
    pub price_range_pct: f64,
    /// Confidence reported when the model exposes no native confidence
    pub default_confidence: f64,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            price_range_pct: 0.10,
            default_confidence: 0.92,
        }
    }
}

/// CORS configuration for the HTTP layer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins; `"*"` means any
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: false,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(figment::Error::from)?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values.
            // HARGAD_CONFIG names the config file itself and is not a field.
            .merge(Env::prefixed("HARGAD_").ignore(&["config"]).split("__"))
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..1.0).contains(&self.response.price_range_pct) {
            return Err(format!(
                "Config validation: response.price_range_pct must be in [0, 1), got {}",
                self.response.price_range_pct
            ));
        }
        if !(0.0..=1.0).contains(&self.response.default_confidence) {
            return Err(format!(
                "Config validation: response.default_confidence must be in [0, 1], got {}",
                self.response.default_confidence
            ));
        }
        if self.cors.allow_credentials && self.cors.allowed_origins.iter().any(|o| o == "*") {
            return Err(
                "Config validation: cors.allow_credentials cannot be combined with a wildcard origin"
                    .to_string(),
            );
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
