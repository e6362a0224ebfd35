//! Per-adapter counters, safe to read without locking.
//! Grounded on `crawler_scheduler::stats::SchedulerStats`'s plain-counter
//! shape and `original_source/crawler_engine/platforms/base.py`'s
//! `_stats` dict.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct AdapterStats {
    pub total_searches: AtomicU64,
    pub successful_searches: AtomicU64,
    pub failed_searches: AtomicU64,
    pub total_jobs_found: AtomicU64,
    pub api_calls: AtomicU64,
    pub scraping_requests: AtomicU64,
    pub vision_requests: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AdapterStatsSnapshot {
    pub total_searches: u64,
    pub successful_searches: u64,
    pub failed_searches: u64,
    pub total_jobs_found: u64,
    pub api_calls: u64,
    pub scraping_requests: u64,
    pub vision_requests: u64,
}

impl AdapterStats {
    pub fn record_search(&self, success: bool, jobs_found: u64) {
        self.total_searches.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_searches.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_searches.fetch_add(1, Ordering::Relaxed);
        }
        self.total_jobs_found.fetch_add(jobs_found, Ordering::Relaxed);
    }

    pub fn record_method(&self, method: crate::capability::SearchMethod) {
        use crate::capability::SearchMethod;
        match method {
            SearchMethod::Api => self.api_calls.fetch_add(1, Ordering::Relaxed),
            SearchMethod::Scraping => self.scraping_requests.fetch_add(1, Ordering::Relaxed),
            SearchMethod::Vision => self.vision_requests.fetch_add(1, Ordering::Relaxed),
            SearchMethod::Hybrid => self.api_calls.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn snapshot(&self) -> AdapterStatsSnapshot {
        AdapterStatsSnapshot {
            total_searches: self.total_searches.load(Ordering::Relaxed),
            successful_searches: self.successful_searches.load(Ordering::Relaxed),
            failed_searches: self.failed_searches.load(Ordering::Relaxed),
            total_jobs_found: self.total_jobs_found.load(Ordering::Relaxed),
            api_calls: self.api_calls.load(Ordering::Relaxed),
            scraping_requests: self.scraping_requests.load(Ordering::Relaxed),
            vision_requests: self.vision_requests.load(Ordering::Relaxed),
        }
    }

    /// Ratio of successful to total searches; `1.0` with no history yet,
    /// matching the registry's "no evidence of failure" prior.
    pub fn success_rate(&self) -> f64 {
        let total = self.total_searches.load(Ordering::Relaxed);
        if total == 0 {
            return 1.0;
        }
        self.successful_searches.load(Ordering::Relaxed) as f64 / total as f64
    }
}
