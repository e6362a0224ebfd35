//! The request/result pair that flows between a caller, the registry, and
//! an adapter. Grounded on
//! `original_source/crawler_engine/platforms/base.py`'s `SearchRequest` /
//! `SearchResult` dataclasses.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crawler_domain::JobRecord;

use crate::capability::SearchMethod;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub company: Option<String>,
    pub date_posted: Option<String>,
    pub remote: Option<bool>,

    pub page: u32,
    pub limit: u32,

    pub sort_by: String,

    pub extra_params: HashMap<String, Value>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            location: None,
            job_type: None,
            experience_level: None,
            salary_min: None,
            salary_max: None,
            company: None,
            date_posted: None,
            remote: None,
            page: 1,
            limit: 25,
            sort_by: "relevance".to_string(),
            extra_params: HashMap::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub jobs: Vec<JobRecord>,
    pub total_count: usize,
    pub page: u32,
    pub has_next_page: bool,
    pub search_query: String,
    pub platform: String,

    pub execution_time_secs: f64,
    pub method_used: SearchMethod,
    pub success: bool,
    pub error_message: Option<String>,

    pub scraped_count: usize,
    pub filtered_count: usize,
    pub duplicate_count: usize,

    pub timestamp: DateTime<Utc>,
    pub metadata: HashMap<String, Value>,
}

impl SearchResult {
    /// A failed result: adapter exceptions are captured into a
    /// `SearchResult` rather than propagated, so a caller fanning out
    /// across platforms never has one bad adapter abort the batch.
    pub fn failed(platform: impl Into<String>, request: &SearchRequest, method: SearchMethod, error_message: impl Into<String>) -> Self {
        Self {
            jobs: Vec::new(),
            total_count: 0,
            page: request.page,
            has_next_page: false,
            search_query: request.query.clone(),
            platform: platform.into(),
            execution_time_secs: 0.0,
            method_used: method,
            success: false,
            error_message: Some(error_message.into()),
            scraped_count: 0,
            filtered_count: 0,
            duplicate_count: 0,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }
}
