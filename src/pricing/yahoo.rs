//! Yahoo Finance chart API provider for B3 daily history

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{Bar, PriceSeries, ProviderError, QuoteProvider};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; B3perfBot/1.0)";

/// Yahoo Finance chart response
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<i64>>>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

pub struct YahooProvider {
    client: Client,
}

impl YahooProvider {
    pub fn new() -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

/// Append the B3 market suffix when it is missing
fn provider_symbol(ticker: &str) -> String {
    let upper = ticker.trim().to_ascii_uppercase();
    if upper.contains('.') {
        upper
    } else {
        format!("{}.SA", upper)
    }
}

#[async_trait]
impl QuoteProvider for YahooProvider {
    async fn fetch_daily_series(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PriceSeries, ProviderError> {
        let symbol = provider_symbol(ticker);
        debug!(
            "Fetching daily series for {} from {} to {}",
            symbol, from, to
        );

        let from_timestamp = from
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ProviderError::BadResponse("invalid from date".to_string()))?
            .and_utc()
            .timestamp();
        let to_timestamp = to
            .and_hms_opt(23, 59, 59)
            .ok_or_else(|| ProviderError::BadResponse("invalid to date".to_string()))?
            .and_utc()
            .timestamp();

        let url = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
            symbol, from_timestamp, to_timestamp
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(symbol));
        }
        if !response.status().is_success() {
            return Err(ProviderError::BadResponse(format!(
                "Yahoo Finance returned error status: {}",
                response.status()
            )));
        }

        let data: YahooChartResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::BadResponse(format!("failed to parse response: {}", e)))?;

        if let Some(error) = data.chart.error {
            // "Not Found" means the symbol does not exist; no point retrying
            if error.code.eq_ignore_ascii_case("not found") {
                return Err(ProviderError::NotFound(symbol));
            }
            return Err(ProviderError::BadResponse(format!(
                "Yahoo Finance API error: {} - {}",
                error.code, error.description
            )));
        }

        let result = data
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| ProviderError::Empty(symbol.clone()))?;

        let timestamps = result
            .timestamp
            .ok_or_else(|| ProviderError::Empty(symbol.clone()))?;

        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Empty(symbol.clone()))?;

        let opens = quote.open.unwrap_or_default();
        let highs = quote.high.unwrap_or_default();
        let lows = quote.low.unwrap_or_default();
        let closes = quote
            .close
            .ok_or_else(|| ProviderError::Empty(symbol.clone()))?;
        let volumes = quote.volume.unwrap_or_default();

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &timestamp) in timestamps.iter().enumerate() {
            let Some(date) =
                chrono::DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
            else {
                warn!("Skipping invalid timestamp {} for {}", timestamp, symbol);
                continue;
            };

            // Provider gaps show up as null closes; keep the rest of the series
            let Some(close) = closes
                .get(i)
                .and_then(|&v| v)
                .and_then(Decimal::from_f64_retain)
            else {
                continue;
            };

            bars.push(Bar {
                date,
                open: opens
                    .get(i)
                    .and_then(|&v| v)
                    .and_then(Decimal::from_f64_retain),
                high: highs
                    .get(i)
                    .and_then(|&v| v)
                    .and_then(Decimal::from_f64_retain),
                low: lows
                    .get(i)
                    .and_then(|&v| v)
                    .and_then(Decimal::from_f64_retain),
                close,
                volume: volumes.get(i).and_then(|&v| v),
            });
        }

        if bars.is_empty() {
            return Err(ProviderError::Empty(symbol));
        }

        let series = PriceSeries::from_bars(bars);
        debug!("Fetched {} daily bars for {}", series.len(), symbol);
        Ok(series)
    }
}
