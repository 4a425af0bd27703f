use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use super::error::ApiError;
use crate::constants::DATE_FORMAT;
use crate::pipeline::{EvaluationMetrics, ForecastReport, Predictions};

/// `null`, `false`, zero, `""`, `[]` and `{}` count as no data
fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

/// Validated body of a `/predict` request
#[derive(Debug, Clone, PartialEq)]
pub struct PredictRequest {
    pub stock_ticker: String,
    pub reference_date: String,
}

impl PredictRequest {
    /// Parse the raw request body
    ///
    /// An empty body, malformed JSON or an empty JSON value is a missing
    /// body. Missing, empty or non-string fields are missing fields.
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::MissingBody)?;
        if is_empty_json(&value) {
            return Err(ApiError::MissingBody);
        }

        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        match (field("stock_ticker"), field("reference_date")) {
            (Some(stock_ticker), Some(reference_date)) => Ok(Self {
                stock_ticker,
                reference_date,
            }),
            _ => Err(ApiError::MissingFields),
        }
    }

    pub fn parse_reference_date(&self) -> Result<NaiveDate, ApiError> {
        NaiveDate::parse_from_str(&self.reference_date, DATE_FORMAT)
            .map_err(|_| ApiError::InvalidDate(self.reference_date.clone()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictResponse {
    pub status: &'static str,
    pub stock_ticker: String,
    pub predictions: Predictions,
    pub metrics: EvaluationMetrics,
}

impl PredictResponse {
    pub fn success(stock_ticker: String, report: ForecastReport) -> Self {
        Self {
            status: "success",
            stock_ticker,
            predictions: report.predictions,
            metrics: report.metrics,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
