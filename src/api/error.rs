use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, warn};
use serde_json::json;
use thiserror::Error;

use crate::error::ForecastError;

/// Failures of a `/predict` request, each with its HTTP status and body
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Content-Type must be application/json")]
    UnsupportedMediaType,

    #[error("No JSON data provided")]
    MissingBody,

    #[error("Stock ticker and reference date are required")]
    MissingFields,

    #[error("Invalid reference date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error("Prediction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::MissingBody | ApiError::MissingFields | ApiError::InvalidDate(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Forecast(ForecastError::NoData { .. }) => StatusCode::NOT_FOUND,
            ApiError::Forecast(ForecastError::InsufficientData { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Forecast(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Request validation errors and missing data carry only `error`
    fn has_status_field(&self) -> bool {
        !matches!(
            self,
            ApiError::UnsupportedMediaType
                | ApiError::MissingBody
                | ApiError::MissingFields
                | ApiError::Forecast(ForecastError::NoData { .. })
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            error!("Error during prediction: {}", message);
        } else {
            warn!("Rejected prediction request ({}): {}", status, message);
        }

        let body = if self.has_status_field() {
            json!({ "status": "error", "error": message })
        } else {
            json!({ "error": message })
        };
        (status, Json(body)).into_response()
    }
}
