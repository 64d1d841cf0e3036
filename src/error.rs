//! Error handling for the B3 performance engine
//!
//! Defines custom error types and establishes a unified Result type
//! using anyhow for context chaining and error propagation.

use thiserror::Error;

/// Core error types for dashboard data operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("config error: {0}")]
    ConfigError(String),

    #[error("sector table error: {0}")]
    SectorError(String),

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Result type alias for engine operations
pub type Result<T> = anyhow::Result<T>;
