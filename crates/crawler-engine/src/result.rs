//! The engine-level result: the assembled outcome of one `search` call
//! across every platform that was asked, plus enough bookkeeping to
//! explain *why* it looks the way it does (partial failures, cost, a
//! confidence score).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crawler_domain::JobRecord;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub total_usd: f64,
    pub by_platform: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub jobs: Vec<JobRecord>,
    pub total_found: usize,
    pub successful_platforms: Vec<String>,
    pub failed_platforms: Vec<String>,
    pub processing_time_ms: u64,
    pub cost_breakdown: CostBreakdown,
    pub confidence_score: f32,
    pub metadata: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl SearchResult {
    /// `0.7 * (successful / total) + 0.3 * min(jobs_found / 50, 1.0)`.
    /// Zero platforms attempted yields zero confidence rather than a
    /// division by zero.
    pub fn confidence(successful: usize, total: usize, jobs_found: usize) -> f32 {
        if total == 0 {
            return 0.0;
        }
        let platform_term = 0.7 * (successful as f32 / total as f32);
        let volume_term = 0.3 * (jobs_found as f32 / 50.0).min(1.0);
        platform_term + volume_term
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_zero_with_no_platforms_attempted() {
        assert_eq!(SearchResult::confidence(0, 0, 0), 0.0);
    }

    #[test]
    fn confidence_caps_the_volume_term_at_fifty_jobs() {
        let at_cap = SearchResult::confidence(1, 1, 50);
        let over_cap = SearchResult::confidence(1, 1, 500);
        assert_eq!(at_cap, over_cap);
        assert!((at_cap - 1.0).abs() < 1e-6);
    }

    #[test]
    fn partial_platform_success_lowers_confidence() {
        let full = SearchResult::confidence(2, 2, 10);
        let partial = SearchResult::confidence(1, 2, 10);
        assert!(partial < full);
    }
}
