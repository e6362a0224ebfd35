//! The engine-level request: what a caller asks for, independent of how
//! many platforms end up serving it. Distinct from
//! `crawler_platform::SearchRequest`, which is page/limit-oriented and
//! per-adapter; [`CrawlerEngine::search`](crate::engine::CrawlerEngine::search)
//! translates one of these into one of those per selected platform.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crawler_domain::ValidationError;

const MAX_RESULTS_CEILING: u32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub location: Option<String>,
    /// Restrict the search to these registered platform names. `None`
    /// lets the registry pick via `select_best`.
    pub platforms: Option<Vec<String>>,
    pub max_results: u32,
    pub filters: HashMap<String, Value>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            location: None,
            platforms: None,
            max_results: 25,
            filters: HashMap::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_platforms(mut self, platforms: Vec<String>) -> Self {
        self.platforms = Some(platforms);
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    /// Non-empty query, `max_results` in `[1, 1000]`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.query.trim().is_empty() {
            return Err(ValidationError::new("search query is empty"));
        }
        if self.max_results < 1 || self.max_results > MAX_RESULTS_CEILING {
            return Err(ValidationError::new(format!(
                "max_results must be in [1, {MAX_RESULTS_CEILING}], got {}",
                self.max_results
            )));
        }
        Ok(())
    }
}
