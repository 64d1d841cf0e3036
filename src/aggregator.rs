//! Batch aggregator
//!
//! Drives the fetcher and returns calculator over the whole ticker
//! universe. Batches run sequentially to pace the provider; tickers inside
//! a batch run concurrently on a `JoinSet`. A failing ticker is logged and
//! omitted from the result, never aborting its siblings or the run.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::pricing::fetcher::fetch_with_retry;
use crate::pricing::{PriceSeries, QuoteProvider};
use crate::returns::{compute_returns, is_suspicious, ReturnSet};
use crate::sectors::SectorMap;

/// Average trade value used to estimate the trade count from financial
/// volume when the provider reports none. Documented approximation only.
const AVG_TRADE_VALUE_BRL: i64 = 5_000;

/// Trade count for the day: either reported by the provider or estimated
/// from financial volume. The distinction is kept so consumers can tell
/// an approximation from a real figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "count")]
pub enum TradeCount {
    /// Figure supplied by the provider. The Yahoo chart endpoint carries no
    /// trade count, so records built from it only ever hold estimates.
    Reported(i64),
    Estimated(i64),
}

impl TradeCount {
    pub fn value(self) -> i64 {
        match self {
            TradeCount::Reported(n) | TradeCount::Estimated(n) => n,
        }
    }

    pub fn is_estimated(self) -> bool {
        matches!(self, TradeCount::Estimated(_))
    }
}

/// One row of the dashboard table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub ticker: String,
    pub sector: String,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Decimal,
    pub volume: Option<i64>,
    /// Approximate traded value in BRL (close × share volume)
    pub financial_volume: Option<Decimal>,
    pub trades: Option<TradeCount>,
    pub returns: ReturnSet,
    /// Set when the series still looked generic after the re-fetch
    pub suspicious: bool,
}

/// Aggregated result of one full run. Row order follows task completion
/// and is not stable; consumers sort before display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceTable {
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<PerformanceRecord>,
}

impl PerformanceTable {
    pub fn row(&self, ticker: &str) -> Option<&PerformanceRecord> {
        self.rows.iter().find(|r| r.ticker == ticker)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Run fetch + compute across the universe in paced batches.
/// `progress(completed, total)` fires once per finished ticker, in
/// completion order. An empty table is a valid (degenerate) result.
pub async fn run_universe<F>(
    provider: Arc<dyn QuoteProvider>,
    sectors: &SectorMap,
    config: &Config,
    mut progress: F,
) -> PerformanceTable
where
    F: FnMut(usize, usize),
{
    let universe: Vec<String> = sectors.tickers().iter().map(|t| t.to_string()).collect();
    let total = universe.len();
    info!(
        "Aggregating {} tickers in batches of {}",
        total, config.batch_size
    );

    let mut rows = Vec::with_capacity(total);
    let mut completed = 0usize;

    for batch in universe.chunks(config.batch_size.max(1)) {
        let mut join_set = JoinSet::new();

        for ticker in batch {
            let provider = Arc::clone(&provider);
            let ticker = ticker.clone();
            let sector = sectors
                .sector(&ticker)
                .unwrap_or("Outros")
                .to_string();
            let config = config.clone();

            join_set.spawn(async move {
                let result = process_ticker(provider.as_ref(), &ticker, &sector, &config).await;
                (ticker, result)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            completed += 1;
            match joined {
                Ok((ticker, Ok(record))) => {
                    debug!("Processed {}", ticker);
                    rows.push(record);
                }
                Ok((ticker, Err(e))) => {
                    warn!("Skipping {}: {}", ticker, e);
                }
                Err(join_err) => {
                    // A panicked task loses one ticker, never the batch
                    warn!("Ticker task failed: {}", join_err);
                }
            }
            progress(completed, total);
        }
    }

    log_duplicate_returns(&rows);

    info!("Aggregated {} of {} tickers", rows.len(), total);
    PerformanceTable {
        generated_at: Utc::now(),
        rows,
    }
}

async fn process_ticker(
    provider: &dyn QuoteProvider,
    ticker: &str,
    sector: &str,
    config: &Config,
) -> anyhow::Result<PerformanceRecord> {
    let mut series =
        fetch_with_retry(provider, ticker, config.lookback_days, config.max_retries).await?;

    let mut suspicious = is_suspicious(&series);
    if suspicious {
        // One alternate-window re-fetch; if still suspicious the data is
        // used as-is but stays flagged for operator visibility
        warn!(
            "Series for {} looks generic, re-fetching with a {}-day window",
            ticker, config.alternate_lookback_days
        );
        match fetch_with_retry(
            provider,
            ticker,
            config.alternate_lookback_days,
            config.max_retries,
        )
        .await
        {
            Ok(alternate) if !is_suspicious(&alternate) => {
                series = alternate;
                suspicious = false;
            }
            Ok(_) => warn!("Series for {} still looks generic after re-fetch", ticker),
            Err(e) => warn!("Alternate-window re-fetch for {} failed: {}", ticker, e),
        }
    }

    build_record(ticker, sector, &series, suspicious)
}

fn build_record(
    ticker: &str,
    sector: &str,
    series: &PriceSeries,
    suspicious: bool,
) -> anyhow::Result<PerformanceRecord> {
    let latest = series
        .last()
        .ok_or_else(|| anyhow::anyhow!("no usable bars for {}", ticker))?;

    let returns = compute_returns(series, latest.date);

    let financial_volume = latest
        .volume
        .map(|shares| latest.close * Decimal::from(shares));
    let trades = financial_volume.as_ref().and_then(estimate_trades);

    Ok(PerformanceRecord {
        ticker: ticker.to_string(),
        sector: sector.to_string(),
        open: latest.open,
        high: latest.high,
        low: latest.low,
        close: latest.close,
        volume: latest.volume,
        financial_volume,
        trades,
        returns,
        suspicious,
    })
}

/// Financial volume divided by the average trade value, tagged estimated
fn estimate_trades(financial_volume: &Decimal) -> Option<TradeCount> {
    if *financial_volume <= Decimal::ZERO {
        return None;
    }
    let count = (*financial_volume / Decimal::from(AVG_TRADE_VALUE_BRL))
        .trunc()
        .to_i64()?;
    Some(TradeCount::Estimated(count))
}

/// Operator diagnostic: rows whose rounded return tuples collide usually
/// mean the provider served the same generic series for several tickers
fn log_duplicate_returns(rows: &[PerformanceRecord]) {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for row in rows {
        let key = return_fingerprint(&row.returns);
        match seen.get(key.as_str()) {
            Some(other) => warn!(
                "{} and {} report near-identical returns; provider data may be generic",
                row.ticker, other
            ),
            None => {
                seen.insert(key, row.ticker.as_str());
            }
        }
    }
}

fn return_fingerprint(returns: &ReturnSet) -> String {
    let rounded = |v: Option<Decimal>| match v {
        Some(pct) => pct.round_dp(1).to_string(),
        None => "-".to_string(),
    };
    format!(
        "{}|{}|{}|{}|{}|{}",
        rounded(returns.daily),
        rounded(returns.weekly),
        rounded(returns.monthly),
        rounded(returns.quarterly),
        rounded(returns.yearly),
        rounded(returns.ytd)
    )
}
