//! A single cache slot: `{value, inserted_at, last_access, access_count,
//! ttl}`.

use std::time::{Duration, Instant};

use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub inserted_at: Instant,
    pub last_access: Instant,
    pub access_count: u64,
    pub ttl: Option<Duration>,
}

impl CacheEntry {
    pub fn new(value: Value, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            value,
            inserted_at: now,
            last_access: now,
            access_count: 0,
            ttl,
        }
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.ttl.map(|ttl| self.inserted_at + ttl)
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at().is_some_and(|exp| Instant::now() >= exp)
    }

    pub fn touch(&mut self) {
        self.last_access = Instant::now();
        self.access_count += 1;
    }
}
