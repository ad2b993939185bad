//! TTL cache and last-known-good fallback store for bar series.
//!
//! Two maps keyed by (symbol, interval): a TTL cache that answers repeat
//! requests within the refresh cadence without upstream I/O, and a fallback
//! map holding the most recent successful series indefinitely. Fallback
//! entries are never purged by age, only replaced by a newer success.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{BarSeries, Interval, Symbol};

/// Cache key: one entry per (symbol, interval) pair.
pub type SeriesKey = (Symbol, Interval);

/// Defines how a fetch interacts with the TTL cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Read a non-expired entry if present; otherwise fetch and store.
    #[default]
    Use,
    /// Always fetch, then store the fresh result.
    Refresh,
    /// Always fetch; do not read or write the cache or fallback maps.
    Bypass,
}

#[derive(Debug, Clone)]
struct FreshEntry {
    series: Arc<BarSeries>,
    fetched_at: DateTime<Utc>,
    stored_at: Instant,
}

/// Last successful series for a key, retained independently of TTL.
#[derive(Debug, Clone)]
pub struct FallbackEntry {
    pub series: Arc<BarSeries>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug)]
struct CacheInner {
    fresh: HashMap<SeriesKey, FreshEntry>,
    fallback: HashMap<SeriesKey, FallbackEntry>,
    ttl: Duration,
}

impl CacheInner {
    fn new(ttl: Duration) -> Self {
        Self {
            fresh: HashMap::new(),
            fallback: HashMap::new(),
            ttl,
        }
    }

    fn get_fresh(&self, key: &SeriesKey) -> Option<(Arc<BarSeries>, DateTime<Utc>)> {
        self.fresh.get(key).and_then(|entry| {
            (entry.stored_at.elapsed() <= self.ttl)
                .then(|| (Arc::clone(&entry.series), entry.fetched_at))
        })
    }

    fn store(&mut self, key: SeriesKey, series: Arc<BarSeries>, fetched_at: DateTime<Utc>) {
        self.fresh.insert(
            key.clone(),
            FreshEntry {
                series: Arc::clone(&series),
                fetched_at,
                stored_at: Instant::now(),
            },
        );
        self.fallback.insert(key, FallbackEntry { series, fetched_at });
        self.purge_expired();
    }

    /// Drop fresh entries older than twice the TTL to bound memory.
    fn purge_expired(&mut self) {
        let horizon = self.ttl * 2;
        self.fresh
            .retain(|_, entry| entry.stored_at.elapsed() <= horizon);
    }
}

/// Thread-safe series cache with TTL and fallback semantics.
#[derive(Debug, Clone)]
pub struct SeriesCache {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
}

impl SeriesCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner::new(ttl))),
        }
    }

    /// Non-expired cached series for the key, if any.
    pub async fn fresh(&self, key: &SeriesKey) -> Option<(Arc<BarSeries>, DateTime<Utc>)> {
        let store = self.inner.read().await;
        store.get_fresh(key)
    }

    /// Record a successful fetch in both the TTL cache and the fallback map.
    pub async fn store(&self, key: SeriesKey, series: Arc<BarSeries>, fetched_at: DateTime<Utc>) {
        let mut store = self.inner.write().await;
        store.store(key, series, fetched_at);
    }

    /// Last successful series for the key, regardless of age.
    pub async fn fallback(&self, key: &SeriesKey) -> Option<FallbackEntry> {
        let store = self.inner.read().await;
        store.fallback.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.fresh.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn fallback_len(&self) -> usize {
        self.inner.read().await.fallback.len()
    }

    /// Write the fallback map to `dir` as one JSON file per key.
    ///
    /// Returns the number of entries written. Used for cross-process warm
    /// starts; the TTL cache is intentionally not persisted.
    pub async fn save_snapshot(&self, dir: &Path) -> io::Result<usize> {
        std::fs::create_dir_all(dir)?;

        let entries: Vec<SnapshotEntry> = {
            let store = self.inner.read().await;
            store
                .fallback
                .iter()
                .map(|((symbol, interval), entry)| SnapshotEntry {
                    symbol: symbol.clone(),
                    interval: *interval,
                    fetched_at: entry.fetched_at,
                    series: (*entry.series).clone(),
                })
                .collect()
        };

        let count = entries.len();
        for entry in entries {
            let name = format!(
                "{}_{}.json",
                entry.symbol.as_str().replace('=', "-"),
                entry.interval.as_str()
            );
            let body = serde_json::to_string(&entry)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            std::fs::write(dir.join(name), body)?;
        }

        debug!(count, dir = %dir.display(), "saved cache snapshot");
        Ok(count)
    }

    /// Load snapshot files from `dir` into the fallback map.
    ///
    /// Loaded entries are arbitrarily stale, so they populate the fallback
    /// map only and are served exclusively when a live fetch fails.
    /// Unreadable files are skipped. Returns the number of entries loaded.
    pub async fn load_snapshot(&self, dir: &Path) -> io::Result<usize> {
        if !dir.exists() {
            return Ok(0);
        }

        let mut loaded = 0usize;
        let mut store = self.inner.write().await;
        for file in std::fs::read_dir(dir)? {
            let path = file?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            let body = match std::fs::read_to_string(&path) {
                Ok(body) => body,
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipping unreadable snapshot file");
                    continue;
                }
            };
            let entry: SnapshotEntry = match serde_json::from_str(&body) {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipping malformed snapshot file");
                    continue;
                }
            };

            store.fallback.insert(
                (entry.symbol, entry.interval),
                FallbackEntry {
                    series: Arc::new(entry.series),
                    fetched_at: entry.fetched_at,
                },
            );
            loaded += 1;
        }

        debug!(loaded, dir = %dir.display(), "loaded cache snapshot");
        Ok(loaded)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    symbol: Symbol,
    interval: Interval,
    fetched_at: DateTime<Utc>,
    series: BarSeries,
}
