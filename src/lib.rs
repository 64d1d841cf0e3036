//! B3perf - Brazilian B3 stock market performance dashboard
//!
//! This library fetches historical quotes for a universe of B3 tickers,
//! computes percentage returns over several horizons, caches the resulting
//! table on disk with a freshness window, and renders it for the terminal.

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod pricing;
pub mod returns;
pub mod sectors;
pub mod utils;
