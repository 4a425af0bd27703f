//! Yahoo Finance daily history

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate};
use log::{debug, info};
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;
use yahoo_finance_api::YahooError;

use super::{HistorySource, PriceBar, PriceHistory};
use crate::error::{ForecastError, ForecastResult};

pub struct YahooHistorySource {
    provider: yahoo::YahooConnector,
}

impl YahooHistorySource {
    pub fn new() -> ForecastResult<Self> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| ForecastError::DataSource(e.to_string()))?;
        Ok(Self { provider })
    }
}

/// Midnight UTC of `date` as the `time` crate's timestamp type
fn to_offset_datetime(date: NaiveDate) -> ForecastResult<OffsetDateTime> {
    let timestamp = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ForecastError::InvalidInput(format!("Invalid date: {}", date)))?
        .and_utc()
        .timestamp();
    OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| ForecastError::InvalidInput(format!("Invalid timestamp for {}: {}", date, e)))
}

/// Errors Yahoo returns for an unknown symbol or a range without trading days
fn is_missing_history(error: &YahooError) -> bool {
    match error {
        YahooError::NoResult | YahooError::NoQuotes => true,
        YahooError::ApiError(message) => {
            let code = message.code.as_deref().unwrap_or_default();
            let description = message
                .description
                .as_deref()
                .unwrap_or_default()
                .to_lowercase();
            code.eq_ignore_ascii_case("not found") || description.contains("no data")
        }
        _ => false,
    }
}

#[async_trait]
impl HistorySource for YahooHistorySource {
    async fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ForecastResult<PriceHistory> {
        // Yahoo treats the end timestamp as exclusive
        let end_exclusive = end.checked_add_days(Days::new(1)).unwrap_or(end);
        let start_odt = to_offset_datetime(start)?;
        let end_odt = to_offset_datetime(end_exclusive)?;

        info!("Fetching {} history from Yahoo Finance: {} to {}", ticker, start, end);
        let quotes = match self
            .provider
            .get_quote_history(ticker, start_odt, end_odt)
            .await
            .and_then(|response| response.quotes())
        {
            Ok(quotes) => quotes,
            Err(e) if is_missing_history(&e) => {
                debug!("No Yahoo history for {}: {}", ticker, e);
                Vec::new()
            }
            Err(e) => return Err(ForecastError::DataSource(e.to_string())),
        };

        let bars: Vec<PriceBar> = quotes
            .iter()
            .filter_map(|q| {
                let date = DateTime::from_timestamp(q.timestamp as i64, 0)?.date_naive();
                Some(PriceBar {
                    date,
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    adj_close: q.adjclose,
                    volume: q.volume as f64,
                })
            })
            .filter(|bar| bar.date >= start && bar.date <= end)
            .collect();

        info!("Received {} daily bars for {}", bars.len(), ticker);
        Ok(PriceHistory::from_bars(bars)?)
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}
