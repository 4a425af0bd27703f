// External crates
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{info, warn};
use polars::prelude::*;
use std::path::{Path, PathBuf};

// Local modules
use super::{HistorySource, PriceBar, PriceHistory};
use crate::constants::DATE_FORMAT;
use crate::error::{ForecastError, ForecastResult};

/// Reads `<dir>/<TICKER>.csv` files exported from a market-data provider
pub struct CsvHistorySource {
    dir: PathBuf,
}

impl CsvHistorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker.to_uppercase()))
    }
}

/// Map a provider column name to its canonical name
fn standard_column_name(name: &str) -> Option<&'static str> {
    let standard = match name.trim().to_lowercase().as_str() {
        "date" | "time" | "timestamp" | "datetime" | "day" => "date",
        "open" | "o" | "open_price" => "open",
        "high" | "h" | "high_price" => "high",
        "low" | "l" | "low_price" => "low",
        "close" | "c" | "close_price" => "close",
        "adj close" | "adj_close" | "adjusted close" | "adjusted_close" | "adjclose" => "adj_close",
        "volume" | "vol" | "v" => "volume",
        _ => return None,
    };
    Some(standard)
}

/// Loads a daily OHLCV CSV into bars with `start <= date <= end`
///
/// # Arguments
///
/// * `full_path` - Path to the CSV file
/// * `start` - First date to keep
/// * `end` - Last date to keep
///
/// # Returns
///
/// Returns the matching bars. A missing file yields an empty history.
pub fn load_history_csv(
    full_path: &Path,
    start: NaiveDate,
    end: NaiveDate,
) -> ForecastResult<PriceHistory> {
    if !full_path.exists() {
        warn!("CSV file not found: {}", full_path.display());
        return Ok(PriceHistory::from_bars(Vec::new())?);
    }

    info!("Loading data from: {}", full_path.display());
    let file = std::fs::File::open(full_path)?;
    let df = CsvReader::new(file).finish()?;

    // Find the source column for every canonical name
    let mut sources: Vec<(&'static str, String)> = Vec::new();
    for column_name in df.get_column_names() {
        if let Some(standard) = standard_column_name(column_name) {
            if !sources.iter().any(|(s, _)| *s == standard) {
                sources.push((standard, column_name.to_string()));
            }
        }
    }
    let source_of = |standard: &str| {
        sources
            .iter()
            .find(|(s, _)| *s == standard)
            .map(|(_, name)| name.clone())
    };

    for required in ["date", "open", "high", "low", "close", "volume"] {
        if source_of(required).is_none() {
            return Err(ForecastError::Polars(PolarsError::ColumnNotFound(
                format!("Required column {} not found in {}", required, full_path.display())
                    .into(),
            )));
        }
    }

    let numeric = |standard: &str| -> PolarsResult<Vec<Option<f64>>> {
        let name = source_of(standard)
            .or_else(|| source_of("close"))
            .unwrap_or_default();
        let column = df.column(&name)?.cast(&DataType::Float64)?;
        Ok(column.f64()?.into_iter().collect())
    };

    let date_column = df
        .column(&source_of("date").unwrap_or_default())?
        .cast(&DataType::String)?;
    let dates: Vec<Option<String>> = date_column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();

    // adj_close falls back to close when the export has no adjusted prices
    let open = numeric("open")?;
    let high = numeric("high")?;
    let low = numeric("low")?;
    let close = numeric("close")?;
    let adj_close = numeric("adj_close")?;
    let volume = numeric("volume")?;

    let mut bars = Vec::with_capacity(dates.len());
    let mut skipped = 0usize;
    for i in 0..dates.len() {
        // Accept both "2020-01-02" and "2020-01-02 00:00:00-05:00"
        let date = dates[i]
            .as_deref()
            .and_then(|s| s.get(..10))
            .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok());
        match (date, open[i], high[i], low[i], close[i], adj_close[i], volume[i]) {
            (Some(date), Some(open), Some(high), Some(low), Some(close), Some(adj_close), Some(volume)) => {
                if date >= start && date <= end {
                    bars.push(PriceBar { date, open, high, low, close, adj_close, volume });
                }
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("Skipped {} incomplete rows in {}", skipped, full_path.display());
    }

    Ok(PriceHistory::from_bars(bars)?)
}

#[async_trait]
impl HistorySource for CsvHistorySource {
    async fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ForecastResult<PriceHistory> {
        let path = self.path_for(ticker);
        tokio::task::spawn_blocking(move || load_history_csv(&path, start, end))
            .await
            .map_err(|e| ForecastError::DataSource(format!("CSV loader task failed: {}", e)))?
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}
