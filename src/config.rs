//! Configuration surface for the data engine
//!
//! All tuning knobs are plain numeric parameters with documented defaults.
//! A TOML file can override any subset of them; missing fields fall back to
//! the defaults, and no dynamic reconfiguration happens at runtime.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};

/// Maximum age of a cached performance table before it is stale
pub const DEFAULT_CACHE_MAX_AGE_HOURS: i64 = 8;
/// Tickers fetched concurrently per batch
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Fetch attempts per ticker before giving up
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Calendar days of history requested per ticker
pub const DEFAULT_LOOKBACK_DAYS: i64 = 365;
/// Shifted window used for the one re-fetch after a suspicious series
pub const DEFAULT_ALTERNATE_LOOKBACK_DAYS: i64 = 450;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub cache_max_age_hours: i64,
    pub batch_size: usize,
    pub max_retries: u32,
    pub lookback_days: i64,
    pub alternate_lookback_days: i64,
    /// Optional CSV file replacing the built-in ticker/sector table
    pub sector_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_max_age_hours: DEFAULT_CACHE_MAX_AGE_HOURS,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            alternate_lookback_days: DEFAULT_ALTERNATE_LOOKBACK_DAYS,
            sector_file: None,
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file.
    /// `None` means defaults; a provided path must exist and parse.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let Some(path) = path else {
            return Ok(Config::default());
        };

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EngineError::ConfigError("batch_size must be at least 1".to_string()).into());
        }
        if self.max_retries == 0 {
            return Err(
                EngineError::ConfigError("max_retries must be at least 1".to_string()).into(),
            );
        }
        if self.lookback_days < 2 {
            return Err(
                EngineError::ConfigError("lookback_days must be at least 2".to_string()).into(),
            );
        }
        if self.alternate_lookback_days < 2 {
            return Err(EngineError::ConfigError(
                "alternate_lookback_days must be at least 2".to_string(),
            )
            .into());
        }
        if self.cache_max_age_hours < 0 {
            return Err(EngineError::ConfigError(
                "cache_max_age_hours must not be negative".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.cache_max_age_hours, 8);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.lookback_days, 365);
        assert_eq!(config.alternate_lookback_days, 450);
        assert!(config.sector_file.is_none());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "batch_size = 5\ncache_max_age_hours = 2").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.cache_max_age_hours, 2);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.lookback_days, 365);
    }

    #[test]
    fn test_invalid_batch_size_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "batch_size = 0").unwrap();

        let result = Config::load(Some(file.path()));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_alternate_lookback_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "alternate_lookback_days = 0").unwrap();

        let result = Config::load(Some(file.path()));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "batchsize = 10").unwrap();

        let result = Config::load(Some(file.path()));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = Config::load(Some(Path::new("/nonexistent/b3perf.toml")));
        assert!(result.is_err());
    }
}
