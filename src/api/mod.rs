//! HTTP surface of the forecasting service.
//!
//! | Method | Path       | Handler |
//! |--------|------------|---------|
//! | GET    | `/`        | [`handlers::index`] |
//! | POST   | `/predict` | [`handlers::predict`] |
//! | GET    | `/health`  | [`handlers::health`] |

pub mod error;
pub mod handlers;
pub mod types;

use axum::routing::{get, post};
use axum::Router;
use chrono::NaiveDate;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::data::HistorySource;
use crate::pipeline::PipelineSettings;

/// Shared by every request
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn HistorySource>,
    pub settings: Arc<PipelineSettings>,
    /// First date of the fetched history
    pub history_start: NaiveDate,
}

impl AppState {
    pub fn new(
        source: Arc<dyn HistorySource>,
        settings: PipelineSettings,
        history_start: NaiveDate,
    ) -> Self {
        Self {
            source,
            settings: Arc::new(settings),
            history_start,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/predict", post(handlers::predict))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
