use polars::error::PolarsError;
use thiserror::Error;

/// Errors raised while fetching data and running the forecasting pipeline.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("No data found for stock ticker: {ticker}")]
    NoData { ticker: String },

    #[error("Not enough data to train the {model} model: {rows} rows, need at least {required}")]
    InsufficientData {
        model: &'static str,
        rows: usize,
        required: usize,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Market data provider error: {0}")]
    DataSource(String),

    #[error("Data frame error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Model error: {0:#}")]
    Model(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ForecastResult<T> = Result<T, ForecastError>;
