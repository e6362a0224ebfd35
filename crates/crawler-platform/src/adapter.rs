//! The per-site adapter contract.
//!
//! Grounded on `packages/extraction/src/traits/crawler.rs`'s `Crawler`
//! trait shape (abstract primitives plus a provided method built on top)
//! and `original_source/crawler_engine/platforms/base.py`'s
//! `BasePlatformAdapter` (`validate_request`, `check_rate_limit`,
//! `get_best_method`, stats bookkeeping around `search_jobs`).

use std::time::Instant;

use async_trait::async_trait;
use crawler_domain::{JobRecord, ValidationError};

use crate::capability::{PlatformCapability, SearchMethod};
use crate::config::PlatformConfig;
use crate::error::PlatformError;
use crate::page::Page;
use crate::rate_limit::RateGovernor;
use crate::request::{SearchRequest, SearchResult};
use crate::stats::{AdapterStats, AdapterStatsSnapshot};

#[async_trait]
pub trait Adapter: Send + Sync {
    fn platform_name(&self) -> &str;
    fn supported_capabilities(&self) -> &[PlatformCapability];
    fn supported_methods(&self) -> &[SearchMethod];
    fn config(&self) -> &PlatformConfig;
    fn rate_governor(&self) -> &RateGovernor;
    fn adapter_stats(&self) -> &AdapterStats;

    /// Pure, deterministic URL construction; encodes query, location,
    /// job type, salary range, date filter, remote flag, sort, and any
    /// platform-specific filters.
    fn build_search_url(&self, request: &SearchRequest) -> String;

    /// Platform-specific dispatch for one method; the only primitive a
    /// concrete adapter must implement to satisfy `search_jobs`.
    async fn dispatch_search(&self, request: &SearchRequest, method: SearchMethod) -> Result<SearchResult, PlatformError>;

    async fn get_job_details(&self, job_url: &str, method: SearchMethod) -> Result<Option<JobRecord>, PlatformError>;

    async fn extract_job_links(&self, page: &dyn Page) -> Result<Vec<String>, PlatformError>;

    async fn parse_job_data(&self, page: &dyn Page, job_url: &str) -> Result<Option<JobRecord>, PlatformError>;

    fn supports_capability(&self, capability: PlatformCapability) -> bool {
        self.supported_capabilities().contains(&capability)
    }

    fn supports_method(&self, method: SearchMethod) -> bool {
        self.supported_methods().contains(&method)
    }

    /// Reject empty query, non-positive page, limit outside
    /// `[1, max_results_per_page]`.
    fn validate_request(&self, request: &SearchRequest) -> Result<(), ValidationError> {
        if request.query.trim().is_empty() {
            return Err(ValidationError::new("search query is empty"));
        }
        if request.page < 1 {
            return Err(ValidationError::new(format!("page must be >= 1, got {}", request.page)));
        }
        let max = self.config().max_results_per_page;
        if request.limit < 1 || request.limit > max {
            return Err(ValidationError::new(format!("limit must be in [1, {max}], got {}", request.limit)));
        }
        Ok(())
    }

    /// Prefer API if credentialed, else Hybrid, else Scraping, else Vision.
    fn best_method(&self, _request: &SearchRequest) -> SearchMethod {
        let methods = self.supported_methods();
        if methods.contains(&SearchMethod::Api) && self.config().api_key.is_some() {
            SearchMethod::Api
        } else if methods.contains(&SearchMethod::Hybrid) {
            SearchMethod::Hybrid
        } else if methods.contains(&SearchMethod::Scraping) {
            SearchMethod::Scraping
        } else if methods.contains(&SearchMethod::Vision) {
            SearchMethod::Vision
        } else {
            methods.first().copied().unwrap_or(SearchMethod::Scraping)
        }
    }

    async fn check_rate_limit(&self) {
        self.rate_governor().acquire().await;
    }

    fn stats(&self) -> AdapterStatsSnapshot {
        self.adapter_stats().snapshot()
    }

    /// Validates, rate-limits, dispatches, and records timing/stats
    /// around the platform-specific [`Adapter::dispatch_search`].
    async fn search_jobs(&self, request: &SearchRequest, method: SearchMethod) -> SearchResult {
        if let Err(e) = self.validate_request(request) {
            return SearchResult::failed(self.platform_name(), request, method, e.reason);
        }

        self.check_rate_limit().await;
        self.adapter_stats().record_method(method);

        let start = Instant::now();
        let outcome = self.dispatch_search(request, method).await;
        let elapsed = start.elapsed().as_secs_f64();

        match outcome {
            Ok(mut result) => {
                result.execution_time_secs = elapsed;
                result.method_used = method;
                result.platform = self.platform_name().to_string();
                self.adapter_stats().record_search(result.success, result.jobs.len() as u64);
                result
            }
            Err(e) => {
                self.adapter_stats().record_search(false, 0);
                let mut result = SearchResult::failed(self.platform_name(), request, method, e.to_string());
                result.execution_time_secs = elapsed;
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAdapter;

    #[test]
    fn validate_request_rejects_empty_query_and_out_of_range_limit() {
        let adapter = MockAdapter::new("stub");
        assert!(adapter.validate_request(&SearchRequest::new("  ")).is_err());
        assert!(adapter.validate_request(&SearchRequest::new("rust").with_page(0)).is_err());
        assert!(adapter.validate_request(&SearchRequest::new("rust").with_limit(999)).is_err());
        assert!(adapter.validate_request(&SearchRequest::new("rust")).is_ok());
    }

    #[test]
    fn best_method_falls_back_to_scraping_without_credentials() {
        let adapter = MockAdapter::new("stub").with_methods(vec![SearchMethod::Api, SearchMethod::Scraping]);
        let request = SearchRequest::new("rust");
        // No api_key configured, so API is skipped even though it's supported.
        assert_eq!(adapter.best_method(&request), SearchMethod::Scraping);
    }

    #[tokio::test]
    async fn search_jobs_wraps_a_failed_request_without_dispatching() {
        let adapter = MockAdapter::new("stub");
        let result = adapter.search_jobs(&SearchRequest::new(""), SearchMethod::Scraping).await;
        assert!(!result.success);
        assert_eq!(adapter.adapter_stats().snapshot().total_searches, 0);
    }

    #[tokio::test]
    async fn search_jobs_records_stats_on_success() {
        let mut job = crawler_domain::JobRecord::new("stub", "Engineer", "Acme", "Sydney", "https://stub.example/1");
        job.finalize_identity();
        let adapter = MockAdapter::new("stub").with_jobs(vec![job]);

        let result = adapter.search_jobs(&SearchRequest::new("rust"), SearchMethod::Scraping).await;
        assert!(result.success);
        assert_eq!(result.jobs.len(), 1);
        let stats = adapter.adapter_stats().snapshot();
        assert_eq!(stats.total_searches, 1);
        assert_eq!(stats.successful_searches, 1);
    }
}
