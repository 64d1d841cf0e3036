// Pricing module - quote provider seam and daily price series types

pub mod fetcher;
pub mod yahoo;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One daily OHLCV bar from the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Decimal,
    pub volume: Option<i64>,
}

/// Daily close series for one ticker, sorted strictly ascending by date.
/// Non-trading days are simply absent; provider gaps are possible. Bars
/// with non-positive closes are dropped at construction so every close in
/// the series is usable in a return computation.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn from_bars(mut bars: Vec<Bar>) -> Self {
        bars.retain(|bar| bar.close > Decimal::ZERO);
        bars.sort_by_key(|bar| bar.date);
        bars.dedup_by_key(|bar| bar.date);
        Self { bars }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Latest bar dated at or before `as_of`
    pub fn bar_at_or_before(&self, as_of: NaiveDate) -> Option<&Bar> {
        self.bars.iter().rev().find(|bar| bar.date <= as_of)
    }
}

/// Provider failure taxonomy. `NotFound` is terminal (the ticker does not
/// exist or is delisted); everything else is transient and retryable.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("ticker not found: {0}")]
    NotFound(String),

    #[error("empty series returned for {0}")]
    Empty(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),
}

impl ProviderError {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}

/// External market-data source for daily history.
/// Implementations address the provider with its own symbol convention
/// (e.g. the `.SA` suffix for B3 tickers on Yahoo Finance).
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_daily_series(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PriceSeries, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use rust_decimal_macros::dec;

    fn bar(date: NaiveDate, close: Decimal) -> Bar {
        Bar {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_from_bars_sorts_by_date() {
        let series = PriceSeries::from_bars(vec![
            bar(day(3), dec!(10)),
            bar(day(1), dec!(11)),
            bar(day(2), dec!(12)),
        ]);
        let dates: Vec<u32> = series.bars().iter().map(|b| b.date.day0() + 1).collect();
        assert_eq!(dates, vec![1, 2, 3]);
    }

    #[test]
    fn test_from_bars_drops_non_positive_closes() {
        let series = PriceSeries::from_bars(vec![
            bar(day(1), dec!(10)),
            bar(day(2), dec!(0)),
            bar(day(3), dec!(-1)),
            bar(day(4), dec!(11)),
        ]);
        assert_eq!(series.len(), 2);
        assert!(series.bars().iter().all(|b| b.close > Decimal::ZERO));
    }

    #[test]
    fn test_from_bars_dedups_dates() {
        let series = PriceSeries::from_bars(vec![bar(day(1), dec!(10)), bar(day(1), dec!(11))]);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_bar_at_or_before() {
        let series = PriceSeries::from_bars(vec![
            bar(day(1), dec!(10)),
            bar(day(3), dec!(11)),
            bar(day(7), dec!(12)),
        ]);
        assert_eq!(series.bar_at_or_before(day(3)).unwrap().close, dec!(11));
        assert_eq!(series.bar_at_or_before(day(5)).unwrap().close, dec!(11));
        assert_eq!(series.bar_at_or_before(day(9)).unwrap().close, dec!(12));
        assert!(series.bar_at_or_before(NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()).is_none());
    }

    #[test]
    fn test_provider_error_terminality() {
        assert!(ProviderError::NotFound("PETR4".to_string()).is_terminal());
        assert!(!ProviderError::Empty("PETR4".to_string()).is_terminal());
        assert!(!ProviderError::Network("timeout".to_string()).is_terminal());
        assert!(!ProviderError::BadResponse("truncated".to_string()).is_terminal());
    }
}
