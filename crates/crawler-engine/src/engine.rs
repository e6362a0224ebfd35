//! The orchestrator: one `search` call validates the request, checks the
//! cost budget, picks platforms, fans the search out across them through
//! the scheduler, feeds whatever comes back through the ETL pipeline, and
//! persists + returns the result.
//!
//! Grounded on `original_source/crawler_engine/core/engine.py`'s
//! `CrawlerEngine.search_jobs` (the six-step flow and its progress
//! markers), wired onto this workspace's own `PlatformRegistry`,
//! `Scheduler`, `CostTracker`, and `Pipeline` rather than the inline
//! helpers the Python class used.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;

use crawler_cost::{CostTracker, LimitCheck};
use crawler_domain::BudgetExceededError;
use crawler_pipeline::{CleaningStage, DeduplicationStage, EnrichmentStage, Pipeline, PipelineConfig, Processor, TransformationStage, ValidationStage};
use crawler_platform::{PlatformCapability, PlatformRegistry};
use crawler_scheduler::{Scheduler, TaskError, TaskPriority, TaskStatus};
use crawler_storage::Storage;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::progress::{emit, ProgressSender, ProgressStage, ProgressUpdate};
use crate::request::SearchRequest;
use crate::result::{CostBreakdown, SearchResult};

/// `crawler_scheduler::Scheduler::new`'s argument when an engine doesn't
/// specify one: bounds how many platform searches run concurrently.
const DEFAULT_SCHEDULER_MAX_CONCURRENT: usize = 5;
/// How many platforms `select_best` hands back when the caller doesn't
/// name any explicitly.
const DEFAULT_PLATFORM_FANOUT: usize = 3;
/// Per-platform search timeout passed to the scheduler.
const PLATFORM_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
const TASK_POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct CrawlerEngine {
    registry: Arc<PlatformRegistry>,
    scheduler: Arc<Scheduler>,
    cost_tracker: Arc<CostTracker>,
    storage: Option<Arc<dyn Storage>>,
    pipeline_config: PipelineConfig,
    platform_fanout: usize,
    started: AtomicBool,
}

impl CrawlerEngine {
    pub fn new(registry: Arc<PlatformRegistry>, cost_tracker: Arc<CostTracker>, storage: Option<Arc<dyn Storage>>, pipeline_config: PipelineConfig) -> Self {
        Self::with_scheduler(registry, Arc::new(Scheduler::new(DEFAULT_SCHEDULER_MAX_CONCURRENT)), cost_tracker, storage, pipeline_config)
    }

    /// Builds the scheduler and cost tracker from `config` (see
    /// [`EngineConfig::from_env`]), leaving the caller only to supply the
    /// platform registry and an optional storage backend.
    pub async fn from_config(registry: Arc<PlatformRegistry>, config: EngineConfig, storage: Option<Arc<dyn Storage>>) -> Self {
        let scheduler = Arc::new(Scheduler::new(config.scheduler_max_concurrent));
        let cost_tracker = Arc::new(CostTracker::in_memory());
        cost_tracker.set_limits(config.cost_limits).await;
        let mut engine = Self::with_scheduler(registry, scheduler, cost_tracker, storage, config.pipeline);
        engine.platform_fanout = config.platform_fanout;
        engine
    }

    pub fn with_scheduler(
        registry: Arc<PlatformRegistry>,
        scheduler: Arc<Scheduler>,
        cost_tracker: Arc<CostTracker>,
        storage: Option<Arc<dyn Storage>>,
        pipeline_config: PipelineConfig,
    ) -> Self {
        scheduler.start();
        Self {
            registry,
            scheduler,
            cost_tracker,
            storage,
            pipeline_config,
            platform_fanout: DEFAULT_PLATFORM_FANOUT,
            started: AtomicBool::new(true),
        }
    }

    pub async fn shutdown(&self) {
        if self.started.swap(false, Ordering::SeqCst) {
            self.scheduler.stop().await;
        }
    }

    pub async fn search(&self, request: SearchRequest) -> Result<SearchResult, EngineError> {
        self.search_with_progress(request, None).await
    }

    pub async fn search_with_progress(&self, request: SearchRequest, progress: Option<ProgressSender>) -> Result<SearchResult, EngineError> {
        let progress = progress.as_ref();
        let start = Instant::now();
        tracing::info!(query = %request.query, max_results = request.max_results, "search starting");

        emit(progress, ProgressUpdate::new(ProgressStage::Validation, "validating search request"));
        request.validate()?;

        let limit_check = self.cost_tracker.check_limits().await;
        if !limit_check.all_ok() {
            let err = budget_error(&limit_check);
            tracing::warn!(scope = %err.scope, current = err.current_usd, limit = err.limit_usd, "search refused, budget exceeded");
            return Err(EngineError::BudgetExceeded(err));
        }

        emit(progress, ProgressUpdate::new(ProgressStage::Analysis, "analyzing search query"));
        let keywords = analyze_query(&request.query);

        emit(progress, ProgressUpdate::new(ProgressStage::PlatformSelection, "selecting search platforms"));
        let platforms = self.select_platforms(&request).await;
        if platforms.is_empty() {
            tracing::warn!("search aborted, no platforms available");
            return Err(EngineError::NoPlatformsAvailable);
        }

        emit(progress, ProgressUpdate::new(ProgressStage::Searching, "dispatching multi-platform search"));
        let (raw_jobs, successful_platforms, failed_platforms) = self.execute_platform_searches(&request, &platforms).await;

        emit(progress, ProgressUpdate::new(ProgressStage::Processing, "processing and deduplicating results"));
        let survivors = self.run_pipeline(raw_jobs).await?;

        emit(progress, ProgressUpdate::new(ProgressStage::Storage, "storing search results"));
        if let Some(storage) = &self.storage {
            storage.store_many(&survivors).await?;
        }

        let confidence_score = SearchResult::confidence(successful_platforms.len(), platforms.len(), survivors.len());
        let total_found = survivors.len();

        let mut metadata = HashMap::new();
        metadata.insert("keywords".to_string(), Value::from(keywords));
        metadata.insert("platforms_attempted".to_string(), Value::from(platforms.clone()));

        emit(progress, ProgressUpdate::new(ProgressStage::Completed, "search completed"));
        tracing::info!(
            total_found,
            successful = successful_platforms.len(),
            failed = failed_platforms.len(),
            confidence_score,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "search completed"
        );

        Ok(SearchResult {
            jobs: survivors,
            total_found,
            successful_platforms,
            failed_platforms,
            processing_time_ms: start.elapsed().as_millis() as u64,
            cost_breakdown: CostBreakdown::default(),
            confidence_score,
            metadata,
            created_at: Utc::now(),
        })
    }

    async fn select_platforms(&self, request: &SearchRequest) -> Vec<String> {
        if let Some(names) = &request.platforms {
            return names.clone();
        }
        let platform_request = platform_request_from(request);
        self.registry
            .select_best(&platform_request, PlatformCapability::JobSearch, self.platform_fanout)
            .await
    }

    /// Submits one scheduler task per platform, polls until every task
    /// settles, and splits results into jobs found, platforms that
    /// answered successfully, and platforms that didn't.
    async fn execute_platform_searches(
        &self,
        request: &SearchRequest,
        platforms: &[String],
    ) -> (Vec<crawler_domain::JobRecord>, Vec<String>, Vec<String>) {
        let platform_request = platform_request_from(request);

        let mut task_ids = Vec::with_capacity(platforms.len());
        for name in platforms {
            let adapter = self.registry.get_adapter(name).await;
            let platform_request = platform_request.clone();
            let id = self.scheduler.submit(TaskPriority::Normal, Some(PLATFORM_SEARCH_TIMEOUT), 0, move || {
                let adapter = adapter.clone();
                let platform_request = platform_request.clone();
                async move {
                    match adapter {
                        Some(adapter) => {
                            let method = adapter.best_method(&platform_request);
                            Ok::<crawler_platform::SearchResult, TaskError>(adapter.search_jobs(&platform_request, method).await)
                        }
                        None => Err(TaskError::Failed("adapter unavailable".to_string())),
                    }
                }
            });
            task_ids.push((name.clone(), id));
        }

        for (_, id) in &task_ids {
            self.await_settled(*id).await;
        }

        let mut jobs = Vec::new();
        let mut successful = Vec::new();
        let mut failed = Vec::new();
        for (name, id) in task_ids {
            match self.scheduler.result::<crawler_platform::SearchResult>(id) {
                Some(Ok(result)) if result.success => {
                    jobs.extend(result.jobs);
                    successful.push(name);
                }
                _ => failed.push(name),
            }
        }
        (jobs, successful, failed)
    }

    async fn await_settled(&self, id: crawler_scheduler::TaskId) {
        loop {
            match self.scheduler.status(id) {
                Some(TaskStatus::Completed) | Some(TaskStatus::Failed) | Some(TaskStatus::Cancelled) | None => return,
                _ => tokio::time::sleep(TASK_POLL_INTERVAL).await,
            }
        }
    }

    async fn run_pipeline(&self, mut jobs: Vec<crawler_domain::JobRecord>) -> Result<Vec<crawler_domain::JobRecord>, EngineError> {
        // Adapters are expected to finalize identity themselves; this is a
        // safety net so a forgetful adapter doesn't silently defeat
        // content-hash deduplication (finalize_identity is idempotent).
        for job in &mut jobs {
            if !job.has_identity() {
                job.finalize_identity();
            }
        }

        let stages: Vec<Arc<dyn Processor>> = vec![
            Arc::new(ValidationStage::new()),
            Arc::new(CleaningStage::new()),
            Arc::new(TransformationStage::new()),
            Arc::new(EnrichmentStage::new()),
            Arc::new(DeduplicationStage::new(self.pipeline_config.similarity_threshold)),
        ];
        let pipeline = Pipeline::new(self.pipeline_config.clone(), stages);
        let (survivors, _metrics) = pipeline.run_collecting(jobs).await?;
        Ok(survivors)
    }
}

fn analyze_query(query: &str) -> Vec<String> {
    query.split_whitespace().map(|s| s.to_lowercase()).collect()
}

fn platform_request_from(request: &SearchRequest) -> crawler_platform::SearchRequest {
    let mut platform_request = crawler_platform::SearchRequest::new(request.query.clone()).with_limit(request.max_results.min(100));
    if let Some(location) = &request.location {
        platform_request = platform_request.with_location(location.clone());
    }
    platform_request
}

/// Picks the tightest breached scope to report; `check_limits` guards the
/// search before any cost is actually spent, so `estimated_usd` is 0.
fn budget_error(check: &LimitCheck) -> BudgetExceededError {
    if !check.daily_limit_ok {
        BudgetExceededError {
            scope: "daily".to_string(),
            limit_usd: check.daily_cost + check.daily_remaining,
            current_usd: check.daily_cost,
            estimated_usd: 0.0,
        }
    } else if !check.hourly_limit_ok {
        BudgetExceededError {
            scope: "hourly".to_string(),
            limit_usd: check.hourly_cost + check.hourly_remaining,
            current_usd: check.hourly_cost,
            estimated_usd: 0.0,
        }
    } else {
        BudgetExceededError {
            scope: "monthly".to_string(),
            limit_usd: check.monthly_cost + check.monthly_remaining,
            current_usd: check.monthly_cost,
            estimated_usd: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawler_cost::CostLimits;
    use crawler_domain::JobRecord;
    use crawler_platform::testing::{factory_for, MockAdapter};
    use crawler_platform::PlatformConfig;
    use crawler_storage::{FileBackend, FileFormat};

    fn job(n: usize, url: &str) -> JobRecord {
        let mut job = JobRecord::new("stub", format!("Python Developer {n}"), "Acme", "Sydney", url);
        job.description = "Build things with Python".to_string();
        job
    }

    async fn registry_with_stub(name: &str, jobs: Vec<JobRecord>) -> Arc<PlatformRegistry> {
        let registry = Arc::new(PlatformRegistry::new());
        let adapter = Arc::new(MockAdapter::new(name).with_jobs(jobs));
        let config = PlatformConfig::new(name, "https://stub.example", "https://stub.example/search");
        registry.register(name, factory_for(adapter), config, 1, true).await;
        registry
    }

    #[tokio::test]
    async fn search_dedups_results_and_reports_success() {
        let dup = job(1, "https://stub.example/1");
        let mut dup2 = job(1, "https://stub.example/1");
        dup2.title = "Python Developer 1 (again)".to_string();
        let jobs = vec![dup, dup2, job(2, "https://stub.example/2")];

        let registry = registry_with_stub("stub", jobs).await;
        let cost_tracker = Arc::new(CostTracker::in_memory());
        let engine = CrawlerEngine::new(registry, cost_tracker, None, PipelineConfig::new("engine-search"));

        let request = SearchRequest::new("python developer").with_location("Sydney").with_max_results(10).with_platforms(vec!["stub".to_string()]);
        let result = engine.search(request).await.unwrap();

        assert_eq!(result.jobs.len(), 2);
        assert_eq!(result.successful_platforms, vec!["stub".to_string()]);
        assert!(result.failed_platforms.is_empty());
        assert!(result.confidence_score > 0.0);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn search_is_refused_once_the_daily_budget_is_exhausted() {
        let registry = registry_with_stub("stub", vec![job(1, "https://stub.example/1")]).await;
        let cost_tracker = Arc::new(CostTracker::in_memory());
        cost_tracker
            .set_limits(CostLimits {
                hourly_limit: 10.0,
                daily_limit: 1.0,
                monthly_limit: 1000.0,
            })
            .await;
        cost_tracker
            .record(crawler_domain::UsageRecord::new("gpt-4-vision-preview", 0, 1.50, "vision"))
            .await;

        let engine = CrawlerEngine::new(registry, cost_tracker, None, PipelineConfig::new("engine-search"));
        let request = SearchRequest::new("python developer").with_platforms(vec!["stub".to_string()]);

        let err = engine.search(request).await.unwrap_err();
        assert!(matches!(err, EngineError::BudgetExceeded(_)));
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn a_failing_platform_does_not_abort_the_others() {
        let registry = Arc::new(PlatformRegistry::new());
        let ok_adapter = Arc::new(MockAdapter::new("stub-ok").with_jobs(vec![job(1, "https://stub.example/1")]));
        registry
            .register("stub-ok", factory_for(ok_adapter), PlatformConfig::new("stub-ok", "https://stub.example", "https://stub.example/search"), 1, true)
            .await;
        let failing_adapter = Arc::new(MockAdapter::new("stub-fail").with_failure("blocked by captcha"));
        registry
            .register(
                "stub-fail",
                factory_for(failing_adapter),
                PlatformConfig::new("stub-fail", "https://stub.example", "https://stub.example/search"),
                1,
                true,
            )
            .await;

        let cost_tracker = Arc::new(CostTracker::in_memory());
        let engine = CrawlerEngine::new(registry, cost_tracker, None, PipelineConfig::new("engine-search"));
        let request = SearchRequest::new("python developer").with_platforms(vec!["stub-ok".to_string(), "stub-fail".to_string()]);

        let result = engine.search(request).await.unwrap();
        assert_eq!(result.successful_platforms, vec!["stub-ok".to_string()]);
        assert_eq!(result.failed_platforms, vec!["stub-fail".to_string()]);
        assert_eq!(result.jobs.len(), 1);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn search_persists_results_when_storage_is_configured() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(FileBackend::new(dir.path().join("jobs.json"), FileFormat::Json));
        storage.initialize().await.unwrap();

        let registry = registry_with_stub("stub", vec![job(1, "https://stub.example/1")]).await;
        let cost_tracker = Arc::new(CostTracker::in_memory());
        let engine = CrawlerEngine::new(registry, cost_tracker, Some(storage.clone()), PipelineConfig::new("engine-search"));

        let request = SearchRequest::new("python developer").with_platforms(vec!["stub".to_string()]);
        let result = engine.search(request).await.unwrap();
        assert_eq!(result.jobs.len(), 1);
        assert_eq!(storage.count(None).await.unwrap(), 1);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn from_config_applies_the_configured_cost_limits() {
        let registry = registry_with_stub("stub", vec![job(1, "https://stub.example/1")]).await;
        let config = EngineConfig {
            cost_limits: CostLimits { hourly_limit: 10.0, daily_limit: 1.0, monthly_limit: 1000.0 },
            ..EngineConfig::default()
        };
        let engine = CrawlerEngine::from_config(registry, config, None).await;
        engine.cost_tracker.record(crawler_domain::UsageRecord::new("gpt-4-vision-preview", 0, 1.50, "vision")).await;

        let request = SearchRequest::new("python developer").with_platforms(vec!["stub".to_string()]);
        let err = engine.search(request).await.unwrap_err();
        assert!(matches!(err, EngineError::BudgetExceeded(_)));
        engine.shutdown().await;
    }
}
