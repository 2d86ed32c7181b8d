//! TTL cache of scraping results keyed by normalised URL
//!
//! Expired entries are treated as misses and dropped on the lookup that finds
//! them. Every insert also sweeps out whatever else has expired, so the map
//! never holds more than the entries written within one TTL.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::product::ScrapingResult;

/// TTL-based cache entry
pub trait CacheItem {
    fn is_expired(&self, ttl: Duration) -> bool;
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: ScrapingResult,
    pub inserted_at: Instant,
}

impl CacheItem for CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() > ttl
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub ttl_seconds: u64,
}

#[derive(Debug)]
pub struct ResultCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ResultCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Cache key: blake3 hex digest of the normalised URL
    pub fn key_for(normalized_url: &str) -> String {
        blake3::hash(normalized_url.as_bytes()).to_hex().to_string()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, normalized_url: &str) -> Option<ScrapingResult> {
        let key = Self::key_for(normalized_url);
        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry) if !entry.is_expired(self.ttl) => return Some(entry.result.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        // Another caller may have refreshed the entry between the two locks
        if entries.get(&key).is_some_and(|e| e.is_expired(self.ttl)) {
            entries.remove(&key);
            debug!("Evicted expired cache entry for {}", normalized_url);
            return None;
        }
        entries.get(&key).map(|e| e.result.clone())
    }

    pub async fn insert(&self, normalized_url: &str, result: ScrapingResult) {
        let key = Self::key_for(normalized_url);
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(self.ttl));
        if entries.len() < before {
            debug!("Swept {} expired cache entries", before - entries.len());
        }
        entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let expired_entries = entries.values().filter(|e| e.is_expired(self.ttl)).count();
        CacheStats {
            total_entries: entries.len(),
            valid_entries: entries.len() - expired_entries,
            expired_entries,
            ttl_seconds: self.ttl.as_secs(),
        }
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
