//! External-model usage accounting record (append-only, persisted by the
//! Cost Tracker, aggregated on read).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub tokens: u64,
    pub cost_usd: f64,
    pub request_type: String,
    pub platform: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
}

impl UsageRecord {
    pub fn new(model: impl Into<String>, tokens: u64, cost_usd: f64, request_type: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            model: model.into(),
            tokens,
            cost_usd,
            request_type: request_type.into(),
            platform: None,
            success: true,
            error_message: None,
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn failed(mut self, error_message: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(error_message.into());
        self
    }
}
