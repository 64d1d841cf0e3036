//! Freshness-gated cache for the aggregated performance table
//!
//! One JSON blob on disk plus an in-memory shadow. Within the freshness
//! window the shadow is preferred over re-reading the file; a stale,
//! missing, or corrupt entry is simply a miss. Saves replace the blob
//! atomically (tmp + rename) and writes hold the shadow lock for the whole
//! disk operation, so readers only ever see fully-written entries.

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::aggregator::PerformanceTable;
use crate::error::Result;

const CACHE_FILENAME: &str = "performance.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CacheEntry {
    pub(crate) stored_at: DateTime<Utc>,
    pub(crate) table: PerformanceTable,
}

pub struct SnapshotCache {
    cache_dir: PathBuf,
    max_age: Duration,
    shadow: Mutex<Option<CacheEntry>>,
}

impl SnapshotCache {
    /// Open (and create if needed) the cache under `dir`, or the platform
    /// cache directory when `None`.
    pub fn new(dir: Option<PathBuf>, max_age_hours: i64) -> Result<Self> {
        let cache_dir = match dir {
            Some(path) => path,
            None => dir_spec::cache_home()
                .ok_or_else(|| anyhow::anyhow!("Could not determine cache directory"))?
                .join("b3perf"),
        };
        fs::create_dir_all(&cache_dir).context("Failed to create cache directory")?;

        Ok(Self {
            cache_dir,
            max_age: Duration::hours(max_age_hours),
            shadow: Mutex::new(None),
        })
    }

    fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(CACHE_FILENAME)
    }

    /// The most recent stored table if still within the freshness window,
    /// otherwise a miss. Never a hard error: a corrupt or unreadable entry
    /// is logged and treated as a miss.
    pub fn get(&self) -> Option<PerformanceTable> {
        let mut shadow = self.shadow.lock().expect("cache lock poisoned");

        if let Some(entry) = shadow.as_ref() {
            if self.is_fresh(entry.stored_at) {
                debug!("Serving performance table from memory shadow");
                return Some(entry.table.clone());
            }
        }

        let entry = match self.read_disk_entry() {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!("Discarding unreadable cache entry: {}", e);
                return None;
            }
        };

        if !self.is_fresh(entry.stored_at) {
            info!(
                "Cache entry from {} is past the {}h freshness window",
                entry.stored_at,
                self.max_age.num_hours()
            );
            return None;
        }

        info!("Loaded cached table generated at {}", entry.stored_at);
        let table = entry.table.clone();
        *shadow = Some(entry);
        Some(table)
    }

    /// Persist `table` stamped with the current time, replacing any prior
    /// entry atomically. Disk I/O failures are reported but non-fatal: the
    /// in-memory shadow is updated regardless, so the current process keeps
    /// serving the table.
    pub fn save(&self, table: &PerformanceTable) {
        let entry = CacheEntry {
            stored_at: Utc::now(),
            table: table.clone(),
        };

        let mut shadow = self.shadow.lock().expect("cache lock poisoned");
        if let Err(e) = self.write_disk_entry(&entry) {
            warn!("Failed to persist performance cache: {}", e);
        } else {
            info!("Saved {} rows to performance cache", table.rows.len());
        }
        *shadow = Some(entry);
    }

    /// Unconditionally drop the persisted entry and the memory shadow
    pub fn invalidate(&self) {
        let mut shadow = self.shadow.lock().expect("cache lock poisoned");
        *shadow = None;

        let path = self.cache_path();
        match fs::remove_file(&path) {
            Ok(()) => info!("Performance cache invalidated"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove cache file {}: {}", path.display(), e),
        }
    }

    fn is_fresh(&self, stored_at: DateTime<Utc>) -> bool {
        Utc::now().signed_duration_since(stored_at) <= self.max_age
    }

    fn read_disk_entry(&self) -> Result<Option<CacheEntry>> {
        let path = self.cache_path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).context("Failed to read cache file")?;
        let entry: CacheEntry =
            serde_json::from_slice(&bytes).context("Failed to parse cache file")?;
        Ok(Some(entry))
    }

    fn write_disk_entry(&self, entry: &CacheEntry) -> Result<()> {
        let path = self.cache_path();
        let tmp_path = self.cache_dir.join(format!("{}.tmp", CACHE_FILENAME));
        let bytes = serde_json::to_vec_pretty(entry).context("Failed to serialize cache entry")?;
        fs::write(&tmp_path, bytes).context("Failed to write cache file")?;
        fs::rename(&tmp_path, &path).context("Failed to finalize cache file")?;
        Ok(())
    }

    #[cfg(test)]
    fn write_entry_stored_at(&self, table: &PerformanceTable, stored_at: DateTime<Utc>) {
        let entry = CacheEntry {
            stored_at,
            table: table.clone(),
        };
        self.write_disk_entry(&entry).unwrap();
    }
}
