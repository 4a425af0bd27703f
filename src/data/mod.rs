//! Historical daily price data.
//!
//! A [`PriceHistory`] is a polars `DataFrame` with one row per trading day:
//!
//! | column      | type    |
//! |-------------|---------|
//! | `date`      | String (`YYYY-MM-DD`) |
//! | `open`      | Float64 |
//! | `high`      | Float64 |
//! | `low`       | Float64 |
//! | `close`     | Float64 |
//! | `adj_close` | Float64 |
//! | `volume`    | Float64 |
//!
//! Rows are sorted by date and every date appears once.

pub mod csv_source;
pub mod yahoo;

use async_trait::async_trait;
use chrono::NaiveDate;
use polars::prelude::*;

use crate::constants::DATE_FORMAT;
use crate::error::ForecastResult;

pub use csv_source::CsvHistorySource;
pub use yahoo::YahooHistorySource;

pub const PRICE_COLUMNS: [&str; 6] = ["open", "high", "low", "close", "adj_close", "volume"];

/// One daily bar
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: f64,
}

/// Daily price history for a single ticker
#[derive(Debug, Clone)]
pub struct PriceHistory {
    frame: DataFrame,
}

impl PriceHistory {
    /// Build a history from bars in any order. Later duplicates of a date are dropped.
    pub fn from_bars(mut bars: Vec<PriceBar>) -> PolarsResult<Self> {
        bars.sort_by_key(|bar| bar.date);
        bars.dedup_by_key(|bar| bar.date);

        let dates: Vec<String> = bars
            .iter()
            .map(|bar| bar.date.format(DATE_FORMAT).to_string())
            .collect();
        // Same order as PRICE_COLUMNS
        let fields: [fn(&PriceBar) -> f64; 6] = [
            |b| b.open,
            |b| b.high,
            |b| b.low,
            |b| b.close,
            |b| b.adj_close,
            |b| b.volume,
        ];

        let mut columns: Vec<Column> = vec![Series::new("date".into(), dates).into()];
        for (name, field) in PRICE_COLUMNS.into_iter().zip(fields) {
            let values: Vec<f64> = bars.iter().map(field).collect();
            columns.push(Series::new(name.into(), values).into());
        }
        let frame = DataFrame::new(columns)?;

        Ok(Self { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Values of a numeric column, with missing entries as NaN
    pub fn column_values(&self, name: &str) -> PolarsResult<Vec<f64>> {
        let values = self
            .frame
            .column(name)?
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        Ok(values)
    }

    pub fn dates(&self) -> PolarsResult<Vec<NaiveDate>> {
        parse_dates(&self.frame)
    }

    /// Rows with `start <= date <= end`
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> PolarsResult<Self> {
        let mask: BooleanChunked = self
            .dates()?
            .into_iter()
            .map(|d| d >= start && d <= end)
            .collect();
        Ok(Self {
            frame: self.frame.filter(&mask)?,
        })
    }

    pub fn last_date(&self) -> PolarsResult<Option<NaiveDate>> {
        Ok(self.dates()?.last().copied())
    }
}

/// Reads the `date` column of a frame as calendar dates
pub fn parse_dates(df: &DataFrame) -> PolarsResult<Vec<NaiveDate>> {
    df.column("date")?
        .str()?
        .into_iter()
        .map(|value| {
            let value = value.ok_or_else(|| {
                PolarsError::ComputeError("Missing value in 'date' column".into())
            })?;
            NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| {
                PolarsError::ComputeError(format!("Invalid date '{}': {}", value, e).into())
            })
        })
        .collect()
}

/// Source of daily price history
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch bars for `ticker` with `start <= date <= end`.
    ///
    /// An unknown ticker or an empty range returns an empty history rather
    /// than an error; the pipeline decides how to report it.
    async fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ForecastResult<PriceHistory>;

    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            adj_close: close,
            volume: 1_000.0,
        }
    }

    #[test]
    fn test_from_bars_sorts_and_dedups() {
        let history = PriceHistory::from_bars(vec![
            bar("2020-01-03", 3.0),
            bar("2020-01-01", 1.0),
            bar("2020-01-02", 2.0),
            bar("2020-01-01", 9.0),
        ])
        .unwrap();

        assert_eq!(history.len(), 3);
        assert_eq!(history.column_values("close").unwrap(), vec![1.0, 2.0, 3.0]);
        for col in PRICE_COLUMNS {
            assert!(history.frame().schema().contains(col), "Missing column {}", col);
        }
    }

    #[test]
    fn test_between_is_inclusive() {
        let history = PriceHistory::from_bars(vec![
            bar("2019-12-31", 1.0),
            bar("2020-01-01", 2.0),
            bar("2020-06-30", 3.0),
            bar("2020-07-01", 4.0),
        ])
        .unwrap();

        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 6, 30).unwrap();
        let window = history.between(start, end).unwrap();

        assert_eq!(window.column_values("close").unwrap(), vec![2.0, 3.0]);
        assert_eq!(window.last_date().unwrap(), Some(end));
    }

    #[test]
    fn test_empty_history() {
        let history = PriceHistory::from_bars(Vec::new()).unwrap();
        assert!(history.is_empty());
        assert_eq!(history.last_date().unwrap(), None);
    }
}
