//! Time-windowed scan report cache.
//!
//! Reports are stored as JSON files keyed by the scan fingerprint. An entry
//! older than the caller's TTL is treated as absent. An entry that cannot be
//! read, does not parse, or was written under another schema version is
//! removed and treated as absent, so a bad cache never blocks a scan.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Fingerprint;
use crate::report::{ScanReport, SCHEMA_VERSION};

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    stored_at: DateTime<Utc>,
    report: ScanReport,
}

/// Cache for scan reports, one JSON file per fingerprint.
#[derive(Debug, Clone)]
pub struct ResultCache {
    cache_dir: PathBuf,
}

impl ResultCache {
    /// Creates a new cache with the specified directory.
    ///
    /// The directory will be created if it doesn't exist.
    pub fn new(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&cache_dir).context("Failed to create cache directory")?;
        Ok(Self { cache_dir })
    }

    /// Retrieves a cached report no older than `ttl`.
    pub fn get(&self, key: &Fingerprint, ttl: Duration) -> Option<ScanReport> {
        let path = self.entry_path(key);
        if !path.exists() {
            return None;
        }

        let entry = match Self::read_entry(&path) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %format!("{e:#}"), "discarding unusable cache entry");
                self.discard(&path);
                return None;
            }
        };

        // A timestamp in the future counts as fresh.
        let age = (Utc::now() - entry.stored_at).to_std().unwrap_or_default();
        if age > ttl {
            debug!(key = %key, age_secs = age.as_secs(), "cache entry expired");
            return None;
        }
        Some(entry.report)
    }

    fn read_entry(path: &Path) -> Result<CacheEntry> {
        let json = std::fs::read_to_string(path).context("Failed to read cached report")?;
        let entry: CacheEntry =
            serde_json::from_str(&json).context("Failed to deserialize cached report")?;
        if entry.report.schema_version != SCHEMA_VERSION {
            bail!(
                "cached report has schema version {} (expected {})",
                entry.report.schema_version,
                SCHEMA_VERSION
            );
        }
        Ok(entry)
    }

    fn discard(&self, path: &Path) {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "failed to remove cache entry");
        }
    }

    /// Stores a report under `key`, replacing any previous entry.
    pub fn put(&self, key: &Fingerprint, report: &ScanReport) -> Result<()> {
        self.put_at(key, report, Utc::now())
    }

    fn put_at(&self, key: &Fingerprint, report: &ScanReport, stored_at: DateTime<Utc>) -> Result<()> {
        let entry = CacheEntry {
            stored_at,
            report: report.clone(),
        };
        let json = serde_json::to_string_pretty(&entry).context("Failed to serialize report")?;
        std::fs::write(self.entry_path(key), json).context("Failed to write cached report")?;
        Ok(())
    }

    /// Removes an entry if present.
    pub fn remove(&self, key: &Fingerprint) -> Result<()> {
        let path = self.entry_path(key);
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove cached report")?;
        }
        Ok(())
    }

    /// Clears all cached reports.
    pub fn clear(&self) -> Result<()> {
        for entry in std::fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            if is_json_file(&path) {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    /// Returns the number of cached reports, fresh or not.
    pub fn len(&self) -> Result<usize> {
        let count = std::fs::read_dir(&self.cache_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| is_json_file(&entry.path()))
            .count();
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn entry_path(&self, key: &Fingerprint) -> PathBuf {
        self.cache_dir.join(format!("{key}.json"))
    }
}

fn is_json_file(path: &Path) -> bool {
    path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::{report, result};
    use sniper_core::screen::SymbolOutcome;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn cache_put_get() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(temp_dir.path()).unwrap();
        let key = "fp_123".to_string();
        let r = report(vec![SymbolOutcome::Qualified(result("A", 1.0))]);

        assert!(cache.get(&key, HOUR).is_none());
        cache.put(&key, &r).unwrap();
        assert_eq!(cache.get(&key, HOUR), Some(r));
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn stale_entry_is_ignored() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(temp_dir.path()).unwrap();
        let key = "fp_old".to_string();
        let r = report(vec![]);

        cache
            .put_at(&key, &r, Utc::now() - chrono::Duration::hours(2))
            .unwrap();
        assert!(cache.get(&key, HOUR).is_none());
        assert!(cache.get(&key, 3 * HOUR).is_some());
        // Expired entries stay on disk until cleared.
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn corrupt_entry_is_a_miss_and_removed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(temp_dir.path()).unwrap();
        let key = "fp_bad".to_string();
        std::fs::write(temp_dir.path().join("fp_bad.json"), "{ not json").unwrap();

        assert!(cache.get(&key, HOUR).is_none());
        assert!(cache.is_empty().unwrap());

        // A fresh put after the miss works as usual.
        cache.put(&key, &report(vec![])).unwrap();
        assert!(cache.get(&key, HOUR).is_some());
    }

    #[test]
    fn other_schema_version_is_a_miss() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(temp_dir.path()).unwrap();
        let key = "fp_old_schema".to_string();
        let mut r = report(vec![]);
        r.schema_version = SCHEMA_VERSION + 1;
        cache.put(&key, &r).unwrap();

        assert!(cache.get(&key, HOUR).is_none());
        assert_eq!(cache.len().unwrap(), 0);
    }

    #[test]
    fn remove_and_clear() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(temp_dir.path()).unwrap();
        for key in ["a", "b", "c"] {
            cache.put(&key.to_string(), &report(vec![])).unwrap();
        }
        std::fs::write(temp_dir.path().join("notes.txt"), "keep").unwrap();

        cache.remove(&"a".to_string()).unwrap();
        assert_eq!(cache.len().unwrap(), 2);

        cache.clear().unwrap();
        assert!(cache.is_empty().unwrap());
        assert!(temp_dir.path().join("notes.txt").exists());
    }
}
