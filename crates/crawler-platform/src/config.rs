//! Per-platform configuration. Every numeric threshold is externally
//! configurable with a documented default. Grounded on
//! `original_source/crawler_engine/platforms/base.py`'s `PlatformConfig`.

use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub name: String,
    pub base_url: String,
    pub search_url: String,
    pub job_detail_url_pattern: String,

    pub max_results_per_page: u32,
    pub max_pages: u32,
    /// Minimum/maximum inter-request delay, uniformly sampled per request.
    pub search_delay_range: (Duration, Duration),

    pub api_key: Option<String>,
    pub api_endpoint: Option<String>,
    pub rate_limit_per_minute: u32,

    pub selectors: HashMap<String, String>,

    pub timeout: Duration,
    pub retry_attempts: u32,

    /// Flat additive nudge applied to this platform's selection score
    /// (spec §4.5's `domain_bonus`), e.g. a platform known to have broad
    /// listing coverage. Data, not a name branch in the scorer.
    pub selection_bonus: f64,
    /// Additional nudge applied only when the search query names a senior
    /// role (manager/director/lead/architect/senior), for platforms known
    /// to skew toward senior postings.
    pub senior_role_bonus: f64,
}

impl PlatformConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, search_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            search_url: search_url.into(),
            job_detail_url_pattern: String::new(),
            max_results_per_page: 25,
            max_pages: 10,
            search_delay_range: (Duration::from_secs(2), Duration::from_secs(5)),
            api_key: None,
            api_endpoint: None,
            rate_limit_per_minute: 60,
            selectors: HashMap::new(),
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
            selection_bonus: 0.0,
            senior_role_bonus: 0.0,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_rate_limit_per_minute(mut self, n: u32) -> Self {
        self.rate_limit_per_minute = n;
        self
    }

    pub fn with_search_delay_range(mut self, min: Duration, max: Duration) -> Self {
        self.search_delay_range = (min, max);
        self
    }

    pub fn with_selector(mut self, key: impl Into<String>, selector: impl Into<String>) -> Self {
        self.selectors.insert(key.into(), selector.into());
        self
    }

    pub fn with_selection_bonus(mut self, bonus: f64) -> Self {
        self.selection_bonus = bonus;
        self
    }

    pub fn with_senior_role_bonus(mut self, bonus: f64) -> Self {
        self.senior_role_bonus = bonus;
        self
    }
}
