//! Required fields, URL well-formedness, salary/date consistency, and a
//! `DataQualityMetrics` rollup attached to `raw`.
//!
//! Grounded on `original_source/crawler_engine/data/processors.py`'s
//! `DataValidator` (`_validate_salary`/`_validate_dates`/
//! `_calculate_quality_metrics`).

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use crawler_domain::{DataQualityMetrics, JobRecord};

use crate::stage::{PipelineStage, Processor, StageOutcome};

/// Scraped timestamps up to this far in the future are tolerated (clock
/// skew between the scraper and storage).
fn future_tolerance() -> ChronoDuration {
    ChronoDuration::minutes(5)
}

pub struct ValidationStage;

impl ValidationStage {
    pub fn new() -> Self {
        Self
    }

    fn quality_metrics(job: &JobRecord) -> DataQualityMetrics {
        let mut filled = 0u32;
        if !job.title.is_empty() {
            filled += 1;
        }
        if !job.company.is_empty() {
            filled += 1;
        }
        if !job.location.is_empty() {
            filled += 1;
        }
        if !job.description.is_empty() {
            filled += 1;
        }
        if job.salary_min.is_some() || job.salary_max.is_some() {
            filled += 1;
        }
        if job.job_type.is_some() {
            filled += 1;
        }
        if job.experience_level.is_some() {
            filled += 1;
        }
        if job.posted_date.is_some() {
            filled += 1;
        }
        if !job.url.is_empty() {
            filled += 1;
        }
        if !job.job_id.is_empty() {
            filled += 1;
        }
        let completeness = filled as f32 / 10.0;

        let url_ok = url::Url::parse(&job.url).is_ok();
        let salary_ok = job.salary_min.map(|v| v >= 0).unwrap_or(true) && job.salary_max.map(|v| v >= 0).unwrap_or(true);
        let accuracy = if url_ok && salary_ok { 1.0 } else { 0.5 };

        let consistency = 1.0;
        let validity = if job.salary_range_is_consistent() && job.dates_are_consistent() { 1.0 } else { 0.5 };
        let uniqueness = 1.0;

        let timeliness = match job.posted_date {
            Some(posted) => {
                let days_old = (Utc::now() - posted).num_days().max(0) as f32;
                (1.0 - days_old / 30.0).max(0.0)
            }
            None => 0.5,
        };

        DataQualityMetrics::from_dimensions(completeness, accuracy, consistency, validity, uniqueness, timeliness)
    }
}

impl Default for ValidationStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Processor for ValidationStage {
    fn stage(&self) -> PipelineStage {
        PipelineStage::Validation
    }

    async fn process(&self, mut job: JobRecord) -> StageOutcome {
        if !job.has_required_descriptive_fields() {
            return StageOutcome::failed(job, "title and company are required");
        }
        if url::Url::parse(&job.url).is_err() {
            return StageOutcome::failed(job, format!("malformed url: {}", job.url));
        }
        if !job.salary_range_is_consistent() {
            return StageOutcome::failed(job, "salary_min exceeds salary_max");
        }
        if let Some(scraped) = job.scraped_date {
            if scraped - Utc::now() > future_tolerance() {
                return StageOutcome::failed(job, "scraped_date is in the future");
            }
        }
        if let Some(posted) = job.posted_date {
            if posted - Utc::now() > future_tolerance() {
                return StageOutcome::failed(job, "posted_date is in the future");
            }
        }
        if !job.dates_are_consistent() {
            return StageOutcome::failed(job, "posted_date is after scraped_date");
        }

        let metrics = Self::quality_metrics(&job);
        job.quality_score = metrics.overall;
        if let serde_json::Value::Object(ref mut map) = job.raw {
            map.insert("quality_metrics".to_string(), serde_json::to_value(metrics).unwrap_or_default());
        } else {
            job.raw = serde_json::json!({ "quality_metrics": metrics });
        }

        StageOutcome::completed(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_job() -> JobRecord {
        let mut job = JobRecord::new("indeed", "Engineer", "Acme", "Sydney", "https://indeed.com/1");
        job.description = "Build distributed systems".to_string();
        job
    }

    #[tokio::test]
    async fn empty_title_fails() {
        let mut job = valid_job();
        job.title = "".to_string();
        let outcome = ValidationStage::new().process(job).await;
        assert_eq!(outcome.status, crate::stage::ItemStatus::Failed);
    }

    #[tokio::test]
    async fn well_formed_record_completes_with_quality_metrics_attached() {
        let outcome = ValidationStage::new().process(valid_job()).await;
        assert_eq!(outcome.status, crate::stage::ItemStatus::Completed);
        let job = outcome.data.unwrap();
        assert!(job.raw.get("quality_metrics").is_some());
        assert!(job.quality_score > 0.0);
    }

    #[tokio::test]
    async fn inconsistent_salary_range_fails() {
        let mut job = valid_job();
        job.salary_min = Some(100_000);
        job.salary_max = Some(50_000);
        let outcome = ValidationStage::new().process(job).await;
        assert_eq!(outcome.status, crate::stage::ItemStatus::Failed);
    }
}
