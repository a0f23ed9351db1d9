//! # hargad: House Price Inference Service
//!
//! `hargad` serves a pre-trained house-price regression model behind an HTTP
//! endpoint. It is a thin, carefully-typed translation layer between a web
//! request schema and the fitted model's expected tabular input: requests are
//! validated, a fixed set of derived features is computed, the persisted
//! preprocessing transformer and regression model are applied, and the
//! result is shaped into a JSON response with optional enrichment fields
//! (confidence, price range, top feature importances, timing).
//!
//! ## Request Flow
//!
//! A `POST /predict` body arrives using the historical wire field names
//! (`LB`, `LT`, `KM`, `KT`, `Kota/Kab`, `Provinsi`, `Type`). The
//! [`api::models::predict::PredictionRequest`] schema maps those to
//! canonical names and enforces range constraints, the
//! [`features`] module derives the fixed 13-column [`features::FeatureRow`],
//! and the [`model::runtime::ModelRuntime`] transforms and predicts. The
//! fitted artifacts are loaded lazily, exactly once per process; concurrent
//! first requests share a single load attempt. The [`response`] module
//! assembles the final [`api::models::predict::PredictionResponse`].
//!
//! Every failure propagates as a typed [`errors::Error`] which the HTTP
//! layer maps to a status code and a human-readable message naming the
//! failing stage. No partial prediction is ever returned.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use hargad::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = hargad::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     hargad::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config)?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options, including the
//! three-tier artifact location chain.

pub mod api;
pub mod config;
pub mod errors;
pub mod features;
pub mod inference;
pub mod model;
pub mod response;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use crate::model::runtime::ModelRuntime;
use axum::http::HeaderValue;
use axum::{
    Router, http,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info};

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub runtime: Arc<ModelRuntime>,
    pub config: Config,
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    // A literal "*" must become AllowOrigin::any(); passing it to list() panics
    let origin = if config.cors.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            origins.push(origin.parse::<HeaderValue>()?);
        }
        AllowOrigin::list(origins)
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([http::Method::GET, http::Method::POST])
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_credentials(config.cors.allow_credentials);

    Ok(cors)
}

/// Build the application router: the prediction endpoint, the health check,
/// CORS, and tracing middleware.
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let cors = create_cors_layer(&state.config)?;

    let router = Router::new()
        .route("/predict", post(api::handlers::predict::predict))
        .route("/health", get(api::handlers::health::health))
        .with_state(state.clone())
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        );

    Ok(router)
}

pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance. The model runtime is constructed
    /// here but artifacts are not loaded until the first prediction.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let runtime = Arc::new(ModelRuntime::new(config.artifacts.paths()));
        let state = AppState::builder()
            .runtime(runtime)
            .config(config.clone())
            .build();
        let router = build_router(&state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "House price service listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
