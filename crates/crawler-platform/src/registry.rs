//! Registry of platform adapters: lazy instantiation, capability/method
//! queries, health-weighted selection, and bounded fan-out search.
//!
//! Grounded on `original_source/crawler_engine/platforms/registry.py`'s
//! `PlatformRegistry` (`PlatformInfo` bookkeeping, `_calculate_platform_score`,
//! health decay/auto-disable, semaphore-bounded `search_multiple_platforms`),
//! translated onto `tokio::sync::RwLock` + a per-platform adapter factory
//! closure in place of the Python class+config pair.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, Semaphore};

use crate::adapter::Adapter;
use crate::capability::{PlatformCapability, SearchMethod};
use crate::config::PlatformConfig;
use crate::request::{SearchRequest, SearchResult};

pub type AdapterFactory = Arc<dyn Fn() -> Arc<dyn Adapter> + Send + Sync>;

struct PlatformInfo {
    factory: AdapterFactory,
    config: PlatformConfig,
    capabilities: Vec<PlatformCapability>,
    methods: Vec<SearchMethod>,
    priority: i32,
    enabled: bool,
    health_score: f64,
    last_health_check: Option<DateTime<Utc>>,
    error_count: u64,
    success_count: u64,
}

#[derive(Debug, Default)]
pub struct RegistryStats {
    pub total_searches: AtomicU64,
    pub successful_searches: AtomicU64,
    pub failed_searches: AtomicU64,
}

pub struct PlatformRegistry {
    platforms: RwLock<HashMap<String, PlatformInfo>>,
    adapters: RwLock<HashMap<String, Arc<dyn Adapter>>>,
    stats: RegistryStats,
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self {
            platforms: RwLock::new(HashMap::new()),
            adapters: RwLock::new(HashMap::new()),
            stats: RegistryStats::default(),
        }
    }

    /// Registers a platform. The factory is invoked once immediately to
    /// read off `supported_capabilities`/`supported_methods`; the
    /// instance it produces is kept as the first cached adapter so a
    /// subsequent `get_adapter` doesn't pay a second construction.
    pub async fn register(
        &self,
        name: impl Into<String>,
        factory: AdapterFactory,
        config: PlatformConfig,
        priority: i32,
        enabled: bool,
    ) -> bool {
        let name = name.into();
        let probe = factory();
        let capabilities = probe.supported_capabilities().to_vec();
        let methods = probe.supported_methods().to_vec();

        let info = PlatformInfo {
            factory,
            config,
            capabilities,
            methods,
            priority,
            enabled,
            health_score: 1.0,
            last_health_check: None,
            error_count: 0,
            success_count: 0,
        };

        tracing::info!(platform = %name, priority, enabled, "platform registered");
        self.platforms.write().await.insert(name.clone(), info);
        self.adapters.write().await.insert(name, probe);
        true
    }

    pub async fn unregister(&self, name: &str) -> bool {
        let removed = self.platforms.write().await.remove(name).is_some();
        if removed {
            self.adapters.write().await.remove(name);
            tracing::info!(platform = %name, "platform unregistered");
        }
        removed
    }

    pub async fn enable(&self, name: &str) -> bool {
        let mut platforms = self.platforms.write().await;
        match platforms.get_mut(name) {
            Some(info) => {
                info.enabled = true;
                true
            }
            None => false,
        }
    }

    pub async fn disable(&self, name: &str) -> bool {
        let mut platforms = self.platforms.write().await;
        match platforms.get_mut(name) {
            Some(info) => {
                info.enabled = false;
                self.adapters.write().await.remove(name);
                true
            }
            None => false,
        }
    }

    /// Lazily instantiates (and caches) the adapter for `name`. Returns
    /// `None` if unregistered or disabled.
    pub async fn get_adapter(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        {
            let platforms = self.platforms.read().await;
            let info = platforms.get(name)?;
            if !info.enabled {
                return None;
            }
        }
        if let Some(adapter) = self.adapters.read().await.get(name) {
            return Some(adapter.clone());
        }
        let factory = self.platforms.read().await.get(name).map(|i| i.factory.clone())?;
        let adapter = factory();
        self.adapters.write().await.insert(name.to_string(), adapter.clone());
        Some(adapter)
    }

    pub async fn platforms_by_capability(&self, capability: PlatformCapability) -> Vec<String> {
        let platforms = self.platforms.read().await;
        self.sorted_matching(&platforms, |info| info.enabled && info.capabilities.contains(&capability))
    }

    pub async fn platforms_by_method(&self, method: SearchMethod) -> Vec<String> {
        let platforms = self.platforms.read().await;
        self.sorted_matching(&platforms, |info| info.enabled && info.methods.contains(&method))
    }

    fn sorted_matching(&self, platforms: &HashMap<String, PlatformInfo>, pred: impl Fn(&PlatformInfo) -> bool) -> Vec<String> {
        let mut matched: Vec<(&String, &PlatformInfo)> = platforms.iter().filter(|(_, info)| pred(info)).collect();
        matched.sort_by(|(_, a), (_, b)| {
            b.priority
                .cmp(&a.priority)
                .then(b.health_score.partial_cmp(&a.health_score).unwrap_or(std::cmp::Ordering::Equal))
        });
        matched.into_iter().map(|(name, _)| name.clone()).collect()
    }

    /// `10*priority + 20*health_score + 30*success_rate + 5*|methods| +
    /// domain_bonus`, where `domain_bonus` nudges platforms whose shape
    /// fits the request (e.g. a salary-focused query favors a platform
    /// that advertises `SalaryInfo`).
    fn score(&self, info: &PlatformInfo, request: &SearchRequest) -> f64 {
        let mut score = info.priority as f64 * 10.0;
        score += info.health_score * 20.0;

        let total = info.success_count + info.error_count;
        if total > 0 {
            score += (info.success_count as f64 / total as f64) * 30.0;
        }

        score += info.methods.len() as f64 * 5.0;
        score += domain_bonus(info, request);
        score
    }

    pub async fn select_best(&self, request: &SearchRequest, capability: PlatformCapability, max: usize) -> Vec<String> {
        let platforms = self.platforms.read().await;
        let mut scored: Vec<(String, f64)> = platforms
            .iter()
            .filter(|(_, info)| info.enabled && info.capabilities.contains(&capability))
            .map(|(name, info)| (name.clone(), self.score(info, request)))
            .collect();
        drop(platforms);

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(max).map(|(name, _)| name).collect()
    }

    /// Fan-out search bounded by `max_concurrent`. An adapter failure
    /// yields a failed [`SearchResult`] for that platform rather than
    /// failing the batch.
    pub async fn search_multiple(
        &self,
        request: &SearchRequest,
        platforms: Option<Vec<String>>,
        max_concurrent: usize,
    ) -> HashMap<String, SearchResult> {
        let names = match platforms {
            Some(names) => names,
            None => self.select_best(request, PlatformCapability::JobSearch, 3).await,
        };

        if names.is_empty() {
            tracing::warn!("no platforms available for search_multiple");
            return HashMap::new();
        }

        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
        let mut handles = Vec::with_capacity(names.len());

        for name in names {
            let semaphore = semaphore.clone();
            let adapter = self.get_adapter(&name).await;
            let request = request.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let result = match adapter {
                    Some(adapter) => {
                        let method = adapter.best_method(&request);
                        adapter.search_jobs(&request, method).await
                    }
                    None => SearchResult::failed(&name, &request, SearchMethod::Scraping, "adapter unavailable"),
                };
                (name, result)
            }));
        }

        let mut results = HashMap::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok((name, result)) => {
                    self.stats.total_searches.fetch_add(1, Ordering::Relaxed);
                    if result.success {
                        self.stats.successful_searches.fetch_add(1, Ordering::Relaxed);
                    } else {
                        self.stats.failed_searches.fetch_add(1, Ordering::Relaxed);
                    }
                    results.insert(name, result);
                }
                Err(e) => tracing::error!(error = %e, "search task panicked"),
            }
        }

        let total_jobs: usize = results.values().filter(|r| r.success).map(|r| r.jobs.len()).sum();
        tracing::info!(platforms = ?results.keys().collect::<Vec<_>>(), total_jobs, "multi-platform search completed");
        results
    }

    /// Runs a lightweight health probe against one or all registered
    /// platforms, adjusting `health_score` and auto-disabling anything
    /// that falls below `0.3`.
    pub async fn health_check(&self, name: Option<&str>) -> HashMap<String, bool> {
        let names: Vec<String> = match name {
            Some(n) => vec![n.to_string()],
            None => self.platforms.read().await.keys().cloned().collect(),
        };

        let mut results = HashMap::new();
        for name in names {
            let enabled = self.platforms.read().await.get(&name).map(|i| i.enabled).unwrap_or(false);
            if !enabled {
                continue;
            }
            let Some(adapter) = self.get_adapter(&name).await else {
                results.insert(name, false);
                continue;
            };
            let healthy = probe_health(&adapter).await;
            results.insert(name.clone(), healthy);

            let mut platforms = self.platforms.write().await;
            if let Some(info) = platforms.get_mut(&name) {
                info.last_health_check = Some(Utc::now());
                if healthy {
                    info.health_score = (info.health_score + 0.1).min(1.0);
                    info.success_count += 1;
                } else {
                    info.health_score = (info.health_score - 0.2).max(0.0);
                    info.error_count += 1;
                    if info.health_score < 0.3 {
                        tracing::warn!(platform = %name, health_score = info.health_score, "health score below threshold, disabling");
                        info.enabled = false;
                    }
                }
            }
        }
        results
    }

    /// Test/ops hook: directly sets a platform's health score and success/
    /// error counters without running a live probe.
    pub async fn set_health(&self, name: &str, health_score: f64, success_count: u64, error_count: u64) {
        let mut platforms = self.platforms.write().await;
        if let Some(info) = platforms.get_mut(name) {
            info.health_score = health_score;
            info.success_count = success_count;
            info.error_count = error_count;
            if info.health_score < 0.3 {
                info.enabled = false;
            }
        }
    }
}

/// Nudges a platform's score toward requests its configured shape fits.
/// Never branches on a platform's name: the per-platform nudges
/// (`selection_bonus`, `senior_role_bonus`) are data carried on
/// [`PlatformConfig`], set by whoever registers the platform, not
/// hardcoded here (spec §9: "branch on capability", not on name).
fn domain_bonus(info: &PlatformInfo, request: &SearchRequest) -> f64 {
    let mut bonus = 0.0;
    if info.capabilities.contains(&PlatformCapability::SalaryInfo) && (request.salary_min.is_some() || request.salary_max.is_some()) {
        bonus += 10.0;
    }
    let senior_keywords = ["senior", "manager", "director", "lead", "architect"];
    if senior_keywords.iter().any(|k| request.query.to_lowercase().contains(k)) {
        bonus += info.config.senior_role_bonus;
    }
    bonus += info.config.selection_bonus;
    bonus
}

async fn probe_health(_adapter: &Arc<dyn Adapter>) -> bool {
    tokio::time::timeout(std::time::Duration::from_secs(5), tokio::time::sleep(std::time::Duration::from_millis(50)))
        .await
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{factory_for, MockAdapter};

    fn platform_config(name: &str) -> PlatformConfig {
        PlatformConfig::new(name, "https://stub.example", "https://stub.example/search")
    }

    async fn register_stub(registry: &PlatformRegistry, name: &str, priority: i32) {
        let adapter = Arc::new(MockAdapter::new(name));
        registry.register(name, factory_for(adapter), platform_config(name), priority, true).await;
    }

    #[tokio::test]
    async fn platforms_by_capability_orders_by_priority_then_health() {
        let registry = PlatformRegistry::new();
        register_stub(&registry, "a", 2).await;
        register_stub(&registry, "b", 2).await;
        registry.set_health("a", 0.9, 9, 1).await;
        registry.set_health("b", 0.5, 5, 5).await;

        let names = registry.platforms_by_capability(PlatformCapability::JobSearch).await;
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn selection_bonus_is_config_data_not_a_name_branch() {
        let registry = PlatformRegistry::new();
        let plain = Arc::new(MockAdapter::new("plain"));
        registry.register("plain", factory_for(plain), platform_config("plain"), 1, true).await;
        let boosted = Arc::new(MockAdapter::new("boosted"));
        let boosted_config = platform_config("boosted").with_selection_bonus(50.0);
        registry.register("boosted", factory_for(boosted), boosted_config, 1, true).await;

        let request = SearchRequest::new("python developer");
        let selected = registry.select_best(&request, PlatformCapability::JobSearch, 2).await;
        assert_eq!(selected, vec!["boosted".to_string(), "plain".to_string()]);
    }

    #[tokio::test]
    async fn low_health_score_auto_disables_and_is_excluded_from_selection() {
        let registry = PlatformRegistry::new();
        register_stub(&registry, "a", 1).await;
        register_stub(&registry, "b", 1).await;
        registry.set_health("a", 0.9, 9, 1).await;
        // Five simulated failures: 1.0 - 5*0.2 = 0.0, below the 0.3 auto-disable floor.
        registry.set_health("b", 0.0, 0, 5).await;

        let request = SearchRequest::new("python developer");
        let selected = registry.select_best(&request, PlatformCapability::JobSearch, 3).await;
        assert_eq!(selected, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn search_multiple_deduplicates_nothing_but_reports_partial_failure() {
        let registry = PlatformRegistry::new();
        let mut job = crawler_domain::JobRecord::new("stub-ok", "Engineer", "Acme", "Sydney", "https://stub.example/1");
        job.finalize_identity();
        let ok_adapter = Arc::new(MockAdapter::new("stub-ok").with_jobs(vec![job]));
        registry.register("stub-ok", factory_for(ok_adapter), platform_config("stub-ok"), 1, true).await;

        let failing_adapter = Arc::new(MockAdapter::new("stub-fail").with_failure("blocked by captcha"));
        registry
            .register("stub-fail", factory_for(failing_adapter), platform_config("stub-fail"), 1, true)
            .await;

        let request = SearchRequest::new("python developer");
        let results = registry
            .search_multiple(&request, Some(vec!["stub-ok".to_string(), "stub-fail".to_string()]), 3)
            .await;

        assert!(results["stub-ok"].success);
        assert_eq!(results["stub-ok"].jobs.len(), 1);
        assert!(!results["stub-fail"].success);
    }
}
