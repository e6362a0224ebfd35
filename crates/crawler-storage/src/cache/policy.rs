//! Eviction policies as strategy objects with a single method
//! `choose_victim(entries) -> key`; adding a policy is a data change, not
//! a rewrite of the cache backend. Grounded on
//! `original_source/crawler_engine/data/cache.py`'s `MemoryCache._evict_one`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::entry::CacheEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    Lru,
    Lfu,
    Fifo,
    Ttl,
}

impl CacheStrategy {
    /// Pick the eviction victim among `entries` under this policy. Returns
    /// `None` only when `entries` is empty.
    pub fn choose_victim<'a>(&self, entries: &'a HashMap<String, CacheEntry>) -> Option<&'a str> {
        if entries.is_empty() {
            return None;
        }
        match self {
            CacheStrategy::Lru => entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.as_str()),
            CacheStrategy::Lfu => entries
                .iter()
                .min_by_key(|(_, e)| (e.access_count, e.last_access))
                .map(|(k, _)| k.as_str()),
            CacheStrategy::Fifo => entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.as_str()),
            CacheStrategy::Ttl => entries
                .iter()
                .filter_map(|(k, e)| e.expires_at().map(|exp| (k, exp)))
                .min_by_key(|(_, exp)| *exp)
                .map(|(k, _)| k.as_str())
                // No entry carries a TTL: fall back to FIFO so insertion
                // never stalls when the TTL policy is selected on an
                // all-permanent cache.
                .or_else(|| {
                    entries
                        .iter()
                        .min_by_key(|(_, e)| e.inserted_at)
                        .map(|(k, _)| k.as_str())
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn entry_at(inserted: Instant, accessed: Instant, count: u64) -> CacheEntry {
        CacheEntry {
            value: serde_json::Value::Null,
            inserted_at: inserted,
            last_access: accessed,
            access_count: count,
            ttl: None,
        }
    }

    #[test]
    fn lru_evicts_oldest_access() {
        let now = Instant::now();
        let mut entries = HashMap::new();
        entries.insert("a".to_string(), entry_at(now, now, 1));
        entries.insert("b".to_string(), entry_at(now, now + Duration::from_secs(10), 1));

        assert_eq!(CacheStrategy::Lru.choose_victim(&entries), Some("a"));
    }

    #[test]
    fn lfu_breaks_ties_with_lru() {
        let now = Instant::now();
        let mut entries = HashMap::new();
        entries.insert("a".to_string(), entry_at(now, now, 2));
        entries.insert("b".to_string(), entry_at(now, now + Duration::from_secs(5), 2));
        entries.insert("c".to_string(), entry_at(now, now, 1));

        assert_eq!(CacheStrategy::Lfu.choose_victim(&entries), Some("c"));
    }

    #[test]
    fn fifo_evicts_oldest_insertion() {
        let now = Instant::now();
        let mut entries = HashMap::new();
        entries.insert("a".to_string(), entry_at(now + Duration::from_secs(5), now, 1));
        entries.insert("b".to_string(), entry_at(now, now, 1));

        assert_eq!(CacheStrategy::Fifo.choose_victim(&entries), Some("b"));
    }
}
