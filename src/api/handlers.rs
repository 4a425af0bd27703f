use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::Json;
use log::info;

use super::error::ApiError;
use super::types::{HealthResponse, PredictRequest, PredictResponse};
use super::AppState;
use crate::error::ForecastError;
use crate::pipeline::run_forecast;

pub const WELCOME_MESSAGE: &str =
    "Welcome to the Stock Prediction API. Use the /predict endpoint to get predictions.";

pub async fn index() -> &'static str {
    WELCOME_MESSAGE
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: crate::built_info::PKG_VERSION,
    })
}

/// Accepts `application/json` and structured `+json` media types
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

pub async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    if !is_json_content_type(&headers) {
        return Err(ApiError::UnsupportedMediaType);
    }

    let request = PredictRequest::from_body(&body)?;
    let reference_date = request.parse_reference_date()?;
    info!(
        "Prediction requested for {} up to {} ({} source)",
        request.stock_ticker,
        reference_date,
        state.source.name()
    );

    let history = state
        .source
        .fetch_history(&request.stock_ticker, state.history_start, reference_date)
        .await?;
    if history.is_empty() {
        return Err(ForecastError::NoData {
            ticker: request.stock_ticker,
        }
        .into());
    }

    let settings = state.settings.clone();
    let ticker = request.stock_ticker.clone();
    let report = tokio::task::spawn_blocking(move || {
        run_forecast(&history, &ticker, reference_date, &settings)
    })
    .await??;

    Ok(Json(PredictResponse::success(request.stock_ticker, report)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_is_json_content_type() {
        assert!(is_json_content_type(&headers("application/json")));
        assert!(is_json_content_type(&headers("application/json; charset=utf-8")));
        assert!(is_json_content_type(&headers("Application/JSON")));
        assert!(is_json_content_type(&headers("application/vnd.api+json")));
        assert!(!is_json_content_type(&headers("text/plain")));
        assert!(!is_json_content_type(&HeaderMap::new()));
    }
}
