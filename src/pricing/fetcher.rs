//! Retry-on-failure historical data fetching
//!
//! Wraps a [`QuoteProvider`] with a bounded retry loop: transient failures
//! (network errors, empty responses) back off exponentially starting at
//! 2^1 seconds and doubling per attempt; a "not found" answer is terminal
//! and never retried. A short series is not a fetch error; the returns
//! calculator degrades per horizon instead.

use chrono::{Duration, Local, NaiveDate};
use std::time::Duration as StdDuration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use super::{PriceSeries, ProviderError, QuoteProvider};

/// Fetch failure after classification. Either terminal or the retry
/// budget is spent; both mean "skip this ticker", never "fail the batch".
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("ticker not found: {0}")]
    NotFound(String),

    #[error("fetch for {ticker} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        ticker: String,
        attempts: u32,
        last_error: String,
    },
}

/// Fetch the last `lookback_days` of daily history for `ticker`,
/// making at most `max_retries` attempts.
pub async fn fetch_with_retry(
    provider: &dyn QuoteProvider,
    ticker: &str,
    lookback_days: i64,
    max_retries: u32,
) -> Result<PriceSeries, FetchError> {
    let to = Local::now().date_naive();
    let from = to - Duration::days(lookback_days);
    fetch_range_with_retry(provider, ticker, from, to, max_retries).await
}

pub async fn fetch_range_with_retry(
    provider: &dyn QuoteProvider,
    ticker: &str,
    from: NaiveDate,
    to: NaiveDate,
    max_retries: u32,
) -> Result<PriceSeries, FetchError> {
    let mut last_error = String::new();

    for attempt in 1..=max_retries {
        let reason = match provider.fetch_daily_series(ticker, from, to).await {
            Ok(series) if series.is_empty() => format!("empty series for {}", ticker),
            Ok(series) => return Ok(series),
            Err(e) if e.is_terminal() => {
                warn!("Ticker {} not found, not retrying", ticker);
                return Err(FetchError::NotFound(ticker.to_string()));
            }
            Err(e) => e.to_string(),
        };

        last_error = reason;

        if attempt < max_retries {
            let delay = backoff_delay(attempt);
            info!(
                "Fetch attempt {}/{} failed for {}: {}. Waiting {}s before retry",
                attempt,
                max_retries,
                ticker,
                last_error,
                delay.as_secs()
            );
            sleep(delay).await;
        }
    }

    warn!(
        "Exhausted {} fetch attempts for {}: {}",
        max_retries, ticker, last_error
    );
    Err(FetchError::Exhausted {
        ticker: ticker.to_string(),
        attempts: max_retries,
        last_error,
    })
}

/// 2^attempt seconds: 2s after the first failure, 4s after the second, ...
fn backoff_delay(attempt: u32) -> StdDuration {
    StdDuration::from_secs(2u64.saturating_pow(attempt))
}
