//! In-memory cache backend. Key = `job:{job_id}`, or
//! `job:{md5(platform|title|company|url)}` when a record hasn't been
//! through `finalize_identity` yet.
//!
//! Grounded on `original_source/crawler_engine/data/cache.py`'s
//! `MemoryCache` (lock discipline, `_evict_one`, `cleanup_expired`
//! background loop) translated onto [`crate::Storage`] so the pipeline's
//! Storage stage can address a cache the same way it addresses the
//! relational and file backends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crawler_domain::JobRecord;

use super::config::{CacheConfig, CacheStats, CacheStatsInner};
use super::entry::CacheEntry;
use crate::error::StorageError;
use crate::query::Query;
use crate::traits::{JobPatch, Storage};

struct Shared {
    config: CacheConfig,
    entries: Mutex<HashMap<String, CacheEntry>>,
    stats: CacheStatsInner,
}

pub struct CacheBackend {
    shared: Arc<Shared>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl CacheBackend {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                entries: Mutex::new(HashMap::new()),
                stats: CacheStatsInner::default(),
            }),
            sweeper: Mutex::new(None),
        }
    }

    /// Start the background sweeper that clears expired entries every
    /// `ttl/4` seconds.
    pub async fn start_sweeper(&self) {
        let mut guard = self.sweeper.lock().await;
        if guard.is_some() {
            return;
        }
        let interval = (self.shared.config.default_ttl / 4).max(Duration::from_millis(1));
        let shared = self.shared.clone();
        *guard = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let mut entries = shared.entries.lock().await;
                let before = entries.len();
                entries.retain(|_, e| !e.is_expired());
                let removed = before - entries.len();
                if removed > 0 {
                    tracing::debug!(removed, "cache sweeper cleared expired entries");
                }
            }
        }));
    }

    pub async fn stop_sweeper(&self) {
        if let Some(handle) = self.sweeper.lock().await.take() {
            handle.abort();
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.shared.stats.snapshot()
    }

    pub async fn size(&self) -> usize {
        self.shared.entries.lock().await.len()
    }

    /// The canonical key for a record: `job:{job_id}` once identity has
    /// been finalized, else a hash over `platform|title|company|url`.
    pub fn key_for(&self, job: &JobRecord) -> String {
        let prefix = &self.shared.config.key_prefix;
        if !job.job_id.is_empty() {
            format!("{prefix}:{}", job.job_id)
        } else {
            let hash = crawler_domain::hashing::md5_join(&[&job.platform, &job.title, &job.company, &job.url]);
            format!("{prefix}:{hash}")
        }
    }

    /// Raw get by key, used directly by cache-eviction tests and callers
    /// that don't have a full `Query`. A TTL-expired entry is treated as
    /// a miss and removed.
    pub async fn get(&self, key: &str) -> Option<JobRecord> {
        let mut entries = self.shared.entries.lock().await;
        let Some(entry) = entries.get(key) else {
            self.shared.stats.misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            return None;
        };
        if entry.is_expired() {
            entries.remove(key);
            self.shared.stats.misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            return None;
        }
        let entry = entries.get_mut(key).unwrap();
        entry.touch();
        self.shared.stats.hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        serde_json::from_value(entry.value.clone()).ok()
    }

    /// Raw set by key, evicting per the configured policy when at
    /// capacity. `ttl = None` uses the config default.
    pub async fn set(&self, key: String, job: JobRecord, ttl: Option<Duration>) -> bool {
        let value = match serde_json::to_value(&job) {
            Ok(v) => v,
            Err(_) => return false,
        };
        let ttl = ttl.or(Some(self.shared.config.default_ttl));

        let mut entries = self.shared.entries.lock().await;
        if entries.len() >= self.shared.config.max_size && !entries.contains_key(&key) {
            if let Some(victim) = self.shared.config.strategy.choose_victim(&entries).map(str::to_string) {
                entries.remove(&victim);
                self.shared.stats.evictions.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        }
        entries.insert(key, CacheEntry::new(value, ttl));
        self.shared.stats.sets.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        true
    }

    pub async fn delete_key(&self, key: &str) -> bool {
        let removed = self.shared.entries.lock().await.remove(key).is_some();
        if removed {
            self.shared.stats.deletes.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        removed
    }
}

#[async_trait]
impl Storage for CacheBackend {
    async fn initialize(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn store(&self, job: &JobRecord) -> Result<bool, StorageError> {
        let key = self.key_for(job);
        let is_new = self.get(&key).await.is_none();
        self.set(key, job.clone(), None).await;
        Ok(is_new)
    }

    async fn retrieve(&self, query: &Query) -> Result<Vec<JobRecord>, StorageError> {
        let entries = self.shared.entries.lock().await;
        let mut jobs: Vec<JobRecord> = entries
            .values()
            .filter(|e| !e.is_expired())
            .filter_map(|e| serde_json::from_value::<JobRecord>(e.value.clone()).ok())
            .filter(|job| query.matches(job))
            .collect();
        if let Some(limit) = query.limit {
            jobs.truncate(limit);
        }
        Ok(jobs)
    }

    async fn update(&self, query: &Query, patch: &JobPatch) -> Result<usize, StorageError> {
        if patch.is_empty() {
            return Ok(0);
        }
        let matching: Vec<JobRecord> = self.retrieve(query).await?;
        let mut affected = 0;
        for mut job in matching {
            patch.apply(&mut job);
            let key = self.key_for(&job);
            self.set(key, job, None).await;
            affected += 1;
        }
        Ok(affected)
    }

    async fn delete(&self, query: &Query) -> Result<usize, StorageError> {
        let matching: Vec<JobRecord> = self.retrieve(query).await?;
        let mut affected = 0;
        for job in matching {
            let key = self.key_for(&job);
            if self.delete_key(&key).await {
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn count(&self, query: Option<&Query>) -> Result<usize, StorageError> {
        match query {
            Some(q) => Ok(self.retrieve(q).await?.len()),
            None => Ok(self.size().await),
        }
    }

    async fn cleanup(&self) -> Result<(), StorageError> {
        let mut entries = self.shared.entries.lock().await;
        entries.retain(|_, e| !e.is_expired());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::policy::CacheStrategy;

    fn job(n: u32) -> JobRecord {
        let mut job = JobRecord::new("indeed", "Engineer", "Acme", "Sydney", format!("https://indeed.com/{n}"));
        job.finalize_identity();
        job
    }

    #[tokio::test]
    async fn lru_eviction_retains_last_max_size_keys() {
        let backend = CacheBackend::new(CacheConfig::default().with_strategy(CacheStrategy::Lru).with_max_size(3));

        for n in 0..5 {
            let j = job(n);
            let key = backend.key_for(&j);
            backend.set(key, j, None).await;
        }

        assert_eq!(backend.size().await, 3);
        // The earliest two keys (0, 1) should have been evicted.
        assert!(backend.get(&backend.key_for(&job(0))).await.is_none());
        assert!(backend.get(&backend.key_for(&job(1))).await.is_none());
        assert!(backend.get(&backend.key_for(&job(4))).await.is_some());
    }

    #[tokio::test]
    async fn ttl_expiry_is_a_miss() {
        let backend = CacheBackend::new(CacheConfig::default());
        let j = job(0);
        let key = backend.key_for(&j);
        backend.set(key.clone(), j, Some(Duration::from_millis(10))).await;

        assert!(backend.get(&key).await.is_some());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(backend.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn store_upsert_reports_insert_vs_update() {
        let backend = CacheBackend::new(CacheConfig::default());
        let j = job(0);
        assert!(Storage::store(&backend, &j).await.unwrap());
        assert!(!Storage::store(&backend, &j).await.unwrap());
    }

    #[tokio::test]
    async fn stats_are_monotonic() {
        let backend = CacheBackend::new(CacheConfig::default());
        let j = job(0);
        Storage::store(&backend, &j).await.unwrap();
        let key = backend.key_for(&j);
        backend.get(&key).await;
        backend.get("missing").await;

        let stats = backend.stats();
        assert!(stats.sets >= 1);
        assert!(stats.hits >= 1);
        assert!(stats.misses >= 1);
    }
}
