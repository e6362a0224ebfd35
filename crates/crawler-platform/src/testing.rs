//! Mock [`Page`] and [`Adapter`] implementations for tests that exercise
//! the registry and the adapter default methods without a real browser or
//! network. Grounded on `packages/extraction/src/testing.rs`'s
//! builder-style mocks with call tracking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crawler_domain::JobRecord;

use crate::adapter::Adapter;
use crate::capability::{PlatformCapability, SearchMethod};
use crate::config::PlatformConfig;
use crate::error::PlatformError;
use crate::page::{ElementRef, Page};
use crate::rate_limit::RateGovernor;
use crate::request::{SearchRequest, SearchResult};
use crate::stats::AdapterStats;

#[derive(Default)]
pub struct MockElementRef {
    pub text: Option<String>,
    pub attributes: HashMap<String, String>,
}

impl MockElementRef {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl ElementRef for MockElementRef {
    async fn text_content(&self) -> Result<Option<String>, PlatformError> {
        Ok(self.text.clone())
    }

    async fn get_attribute(&self, name: &str) -> Result<Option<String>, PlatformError> {
        Ok(self.attributes.get(name).cloned())
    }
}

/// A scripted page: every method returns a value seeded at construction
/// time rather than performing real navigation.
pub struct MockPage {
    url: Mutex<String>,
    elements: HashMap<String, Vec<MockElementRef>>,
    title: String,
}

impl MockPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Mutex::new(url.into()),
            elements: HashMap::new(),
            title: String::new(),
        }
    }

    pub fn with_elements(mut self, selector: impl Into<String>, elements: Vec<MockElementRef>) -> Self {
        self.elements.insert(selector.into(), elements);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

#[async_trait]
impl Page for MockPage {
    async fn goto(&self, url: &str) -> Result<(), PlatformError> {
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn wait_for_selector(&self, _selector: &str, _timeout_ms: u64) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn query_selector(&self, selector: &str) -> Result<Option<Box<dyn ElementRef>>, PlatformError> {
        Ok(self.elements.get(selector).and_then(|els| els.first()).map(|el| {
            Box::new(MockElementRef {
                text: el.text.clone(),
                attributes: el.attributes.clone(),
            }) as Box<dyn ElementRef>
        }))
    }

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementRef>>, PlatformError> {
        Ok(self
            .elements
            .get(selector)
            .map(|els| {
                els.iter()
                    .map(|el| {
                        Box::new(MockElementRef {
                            text: el.text.clone(),
                            attributes: el.attributes.clone(),
                        }) as Box<dyn ElementRef>
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn evaluate(&self, _script: &str) -> Result<Value, PlatformError> {
        Ok(Value::Null)
    }

    async fn title(&self) -> Result<String, PlatformError> {
        Ok(self.title.clone())
    }

    fn url(&self) -> String {
        self.url.lock().unwrap().clone()
    }

    async fn screenshot(&self) -> Result<Vec<u8>, PlatformError> {
        Ok(Vec::new())
    }
}

/// A stub adapter that returns a pre-seeded [`SearchResult`] (or error)
/// regardless of the request, for exercising the registry's selection
/// and fan-out logic.
pub struct MockAdapter {
    name: String,
    config: PlatformConfig,
    capabilities: Vec<PlatformCapability>,
    methods: Vec<SearchMethod>,
    rate_governor: RateGovernor,
    stats: AdapterStats,
    jobs: Vec<JobRecord>,
    fail_with: Option<String>,
}

impl MockAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let config = PlatformConfig::new(name.clone(), "https://stub.example", "https://stub.example/search");
        Self {
            rate_governor: RateGovernor::new(&config),
            name,
            config,
            capabilities: vec![PlatformCapability::JobSearch],
            methods: vec![SearchMethod::Scraping],
            stats: AdapterStats::default(),
            jobs: Vec::new(),
            fail_with: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<PlatformCapability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_methods(mut self, methods: Vec<SearchMethod>) -> Self {
        self.methods = methods;
        self
    }

    pub fn with_jobs(mut self, jobs: Vec<JobRecord>) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn platform_name(&self) -> &str {
        &self.name
    }

    fn supported_capabilities(&self) -> &[PlatformCapability] {
        &self.capabilities
    }

    fn supported_methods(&self) -> &[SearchMethod] {
        &self.methods
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }

    fn rate_governor(&self) -> &RateGovernor {
        &self.rate_governor
    }

    fn adapter_stats(&self) -> &AdapterStats {
        &self.stats
    }

    fn build_search_url(&self, request: &SearchRequest) -> String {
        format!("{}?q={}", self.config.search_url, request.query)
    }

    async fn dispatch_search(&self, request: &SearchRequest, method: SearchMethod) -> Result<SearchResult, PlatformError> {
        if let Some(message) = &self.fail_with {
            return Err(PlatformError::Blocked(crawler_domain::BlockedError { reason: message.clone() }));
        }
        let mut result = SearchResult::failed(&self.name, request, method, "");
        result.success = true;
        result.error_message = None;
        result.jobs = self.jobs.clone();
        result.total_count = self.jobs.len();
        result.scraped_count = self.jobs.len();
        Ok(result)
    }

    async fn get_job_details(&self, job_url: &str, _method: SearchMethod) -> Result<Option<JobRecord>, PlatformError> {
        Ok(self.jobs.iter().find(|j| j.url == job_url).cloned())
    }

    async fn extract_job_links(&self, page: &dyn Page) -> Result<Vec<String>, PlatformError> {
        let mut links = Vec::new();
        for element in page.query_selector_all("a.job-link").await? {
            if let Some(href) = element.get_attribute("href").await? {
                links.push(href);
            }
        }
        Ok(links)
    }

    async fn parse_job_data(&self, _page: &dyn Page, job_url: &str) -> Result<Option<JobRecord>, PlatformError> {
        Ok(self.jobs.iter().find(|j| j.url == job_url).cloned())
    }
}

pub fn factory_for(adapter: Arc<MockAdapter>) -> crate::registry::AdapterFactory {
    Arc::new(move || adapter.clone() as Arc<dyn Adapter>)
}
