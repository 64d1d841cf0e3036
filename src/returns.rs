//! Returns calculator
//!
//! Turns an irregular daily close series into percentage returns over the
//! named horizons. Trading days are unevenly spaced, so each horizon uses
//! nearest-date matching against its target date instead of fixed-offset
//! indexing. A horizon whose implied bar is missing is explicitly
//! unavailable (`None`), never silently zero.

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::PriceSeries;

/// Named lookback horizons in calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Horizon {
    pub const ALL: [Horizon; 5] = [
        Horizon::Daily,
        Horizon::Weekly,
        Horizon::Monthly,
        Horizon::Quarterly,
        Horizon::Yearly,
    ];

    pub fn days(self) -> i64 {
        match self {
            Horizon::Daily => 1,
            Horizon::Weekly => 7,
            Horizon::Monthly => 30,
            Horizon::Quarterly => 90,
            Horizon::Yearly => 365,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Horizon::Daily => "daily",
            Horizon::Weekly => "weekly",
            Horizon::Monthly => "monthly",
            Horizon::Quarterly => "quarterly",
            Horizon::Yearly => "yearly",
        }
    }
}

/// Percentage returns per horizon; `None` means the series could not
/// support the computation (too short, missing denominator, bad close)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnSet {
    pub daily: Option<Decimal>,
    pub weekly: Option<Decimal>,
    pub monthly: Option<Decimal>,
    pub quarterly: Option<Decimal>,
    pub yearly: Option<Decimal>,
    pub ytd: Option<Decimal>,
}

impl ReturnSet {
    pub fn get(&self, horizon: Horizon) -> Option<Decimal> {
        match horizon {
            Horizon::Daily => self.daily,
            Horizon::Weekly => self.weekly,
            Horizon::Monthly => self.monthly,
            Horizon::Quarterly => self.quarterly,
            Horizon::Yearly => self.yearly,
        }
    }
}

/// Compute all horizon returns for `series` as of `as_of`.
/// Pure and deterministic: same series and date, same output.
pub fn compute_returns(series: &PriceSeries, as_of: NaiveDate) -> ReturnSet {
    ReturnSet {
        daily: horizon_return(series, as_of, Horizon::Daily.days()),
        weekly: horizon_return(series, as_of, Horizon::Weekly.days()),
        monthly: horizon_return(series, as_of, Horizon::Monthly.days()),
        quarterly: horizon_return(series, as_of, Horizon::Quarterly.days()),
        yearly: horizon_return(series, as_of, Horizon::Yearly.days()),
        ytd: ytd_return(series, as_of),
    }
}

/// `(close(as_of) / close(nearest bar to as_of - days) - 1) * 100`
///
/// The denominator is the bar strictly before the as-of bar whose date is
/// nearest to the target; unavailable when the series has no bar at or
/// before the target date at all.
fn horizon_return(series: &PriceSeries, as_of: NaiveDate, days: i64) -> Option<Decimal> {
    let latest = series.bar_at_or_before(as_of)?;
    let target = as_of - Duration::days(days);

    // The series must actually reach back to the target
    series.first().filter(|bar| bar.date <= target)?;

    let denominator = series
        .bars()
        .iter()
        .filter(|bar| bar.date < latest.date)
        .min_by_key(|bar| (bar.date - target).num_days().abs())?;

    percentage_change(denominator.close, latest.close)
}

/// Year-to-date return: denominator is the close at or nearest after
/// January 1 of the as-of year. Unavailable when the series starts after
/// January 1 (no honest baseline exists).
fn ytd_return(series: &PriceSeries, as_of: NaiveDate) -> Option<Decimal> {
    let latest = series.bar_at_or_before(as_of)?;
    let jan_first = NaiveDate::from_ymd_opt(as_of.year(), 1, 1)?;

    if series.first()?.date > jan_first {
        return None;
    }

    let baseline = series
        .bars()
        .iter()
        .find(|bar| bar.date >= jan_first)
        .filter(|bar| bar.date < latest.date)?;

    percentage_change(baseline.close, latest.close)
}

fn percentage_change(from: Decimal, to: Decimal) -> Option<Decimal> {
    if from <= Decimal::ZERO {
        return None;
    }
    Some((to / from - Decimal::ONE) * Decimal::from(100))
}

/// Fraction of identical consecutive deltas above which a series is flagged
const IDENTICAL_DELTA_PERCENT: usize = 30;
/// Day-over-day changes needed before the heuristic has any signal
const MIN_CHANGES_FOR_HEURISTIC: usize = 5;

/// Heuristic guard against a known provider failure mode: a cached or
/// generic series handed back for an unrecognized ticker. Flags a series
/// whose day-over-day percentage changes have near-zero variance, or where
/// more than 30% of consecutive deltas are numerically identical. A flag
/// means "consider one re-fetch with a shifted window", not "bad data".
pub fn is_suspicious(series: &PriceSeries) -> bool {
    let changes = daily_changes(series);
    if changes.len() < MIN_CHANGES_FOR_HEURISTIC {
        return false;
    }

    // Near-zero variance: all deltas essentially the same magnitude
    let n = Decimal::from(changes.len() as u64);
    let mean = changes.iter().copied().sum::<Decimal>() / n;
    let variance = changes
        .iter()
        .map(|c| {
            let d = *c - mean;
            d * d
        })
        .sum::<Decimal>()
        / n;
    // 0.0001 %^2, i.e. a daily standard deviation under one basis point
    if variance < Decimal::new(1, 4) {
        return true;
    }

    let identical = changes
        .windows(2)
        .filter(|pair| pair[0] == pair[1])
        .count();
    identical * 100 > (changes.len() - 1) * IDENTICAL_DELTA_PERCENT
}

fn daily_changes(series: &PriceSeries) -> Vec<Decimal> {
    series
        .bars()
        .windows(2)
        .filter_map(|pair| percentage_change(pair[0].close, pair[1].close))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::Bar;
    use rust_decimal_macros::dec;

    fn series_from_closes(start: NaiveDate, closes: &[Decimal]) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: start + Duration::days(i as i64),
                open: None,
                high: None,
                low: None,
                close,
                volume: None,
            })
            .collect();
        PriceSeries::from_bars(bars)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_return_concrete() {
        // Closes 100, 102, 99, 105 on consecutive days; daily return as of
        // the last day is (105/99 - 1) * 100 ≈ 6.06%
        let start = date(2025, 3, 10);
        let series = series_from_closes(start, &[dec!(100), dec!(102), dec!(99), dec!(105)]);
        let as_of = start + Duration::days(3);

        let returns = compute_returns(&series, as_of);
        let daily = returns.daily.expect("daily return should be available");
        assert_eq!(daily.round_dp(2), dec!(6.06));
    }

    #[test]
    fn test_short_series_misses_long_horizons() {
        // Ten days of data: daily and weekly computable, quarterly and
        // yearly explicitly unavailable
        let start = date(2025, 3, 1);
        let closes: Vec<Decimal> = (0..10).map(|i| Decimal::from(100 + i * 3)).collect();
        let series = series_from_closes(start, &closes);
        let as_of = start + Duration::days(9);

        let returns = compute_returns(&series, as_of);
        assert!(returns.daily.is_some());
        assert!(returns.weekly.is_some());
        assert!(returns.quarterly.is_none());
        assert!(returns.yearly.is_none());
    }

    #[test]
    fn test_single_bar_has_no_returns() {
        let series = series_from_closes(date(2025, 3, 1), &[dec!(100)]);
        let returns = compute_returns(&series, date(2025, 3, 1));
        assert_eq!(returns, ReturnSet::default());
    }

    #[test]
    fn test_empty_series_has_no_returns() {
        let series = PriceSeries::from_bars(vec![]);
        let returns = compute_returns(&series, date(2025, 3, 1));
        assert_eq!(returns, ReturnSet::default());
    }

    #[test]
    fn test_nearest_date_skips_weekend_gap() {
        // Friday 100, Monday 110. Daily target is Sunday; nearest prior
        // trading day is Friday, so the daily return must be 10%, not 0%.
        let bars = vec![
            Bar {
                date: date(2025, 3, 7),
                open: None,
                high: None,
                low: None,
                close: dec!(100),
                volume: None,
            },
            Bar {
                date: date(2025, 3, 10),
                open: None,
                high: None,
                low: None,
                close: dec!(110),
                volume: None,
            },
        ];
        let series = PriceSeries::from_bars(bars);

        let daily = horizon_return(&series, date(2025, 3, 10), 1);
        assert_eq!(daily, Some(dec!(10)));
    }

    #[test]
    fn test_ytd_uses_first_bar_at_or_after_january() {
        // Series spans the year boundary; baseline is the first bar on or
        // after January 1
        let start = date(2024, 12, 28);
        let closes: Vec<Decimal> = vec![
            dec!(90),  // Dec 28
            dec!(95),  // Dec 29
            dec!(98),  // Dec 30
            dec!(99),  // Dec 31
            dec!(100), // Jan 1
            dec!(104), // Jan 2
            dec!(110), // Jan 3
        ];
        let series = series_from_closes(start, &closes);

        let ytd = ytd_return(&series, date(2025, 1, 3)).unwrap();
        assert_eq!(ytd.round_dp(2), dec!(10.00));
    }

    #[test]
    fn test_ytd_unavailable_when_series_starts_after_january() {
        let start = date(2025, 3, 1);
        let closes: Vec<Decimal> = (0..10).map(|i| Decimal::from(100 + i)).collect();
        let series = series_from_closes(start, &closes);

        assert!(ytd_return(&series, date(2025, 3, 10)).is_none());
    }

    #[test]
    fn test_true_zero_return_is_some_zero() {
        // A flat pair of closes is a genuine 0% return, not "unavailable"
        let series = series_from_closes(date(2025, 3, 1), &[dec!(50), dec!(50)]);
        let daily = horizon_return(&series, date(2025, 3, 2), 1);
        assert_eq!(daily, Some(dec!(0)));
    }

    #[test]
    fn test_flat_series_is_suspicious() {
        let closes: Vec<Decimal> = std::iter::repeat(dec!(42)).take(20).collect();
        let series = series_from_closes(date(2025, 3, 1), &closes);
        assert!(is_suspicious(&series));
    }

    #[test]
    fn test_constant_growth_is_suspicious() {
        // +1% every single day: every delta identical
        let mut closes = vec![dec!(100)];
        for _ in 0..19 {
            let last = *closes.last().unwrap();
            closes.push(last * dec!(1.01));
        }
        let series = series_from_closes(date(2025, 3, 1), &closes);
        assert!(is_suspicious(&series));
    }

    #[test]
    fn test_varied_series_is_not_suspicious() {
        let closes = vec![
            dec!(100),
            dec!(103),
            dec!(99),
            dec!(104),
            dec!(101),
            dec!(97),
            dec!(105),
            dec!(102),
            dec!(108),
            dec!(103),
        ];
        let series = series_from_closes(date(2025, 3, 1), &closes);
        assert!(!is_suspicious(&series));
    }

    #[test]
    fn test_short_series_not_flagged() {
        // Too little signal for the heuristic
        let series = series_from_closes(date(2025, 3, 1), &[dec!(10), dec!(10), dec!(10)]);
        assert!(!is_suspicious(&series));
    }

    #[test]
    fn test_returns_are_deterministic() {
        let start = date(2025, 1, 2);
        let closes: Vec<Decimal> = (0..120).map(|i| Decimal::from(100 + (i * 7) % 13)).collect();
        let series = series_from_closes(start, &closes);
        let as_of = start + Duration::days(119);

        let first = compute_returns(&series, as_of);
        let second = compute_returns(&series, as_of);
        assert_eq!(first, second);
    }
}
