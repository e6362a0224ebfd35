//! The canonical job posting record that flows through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hashing;

/// Employment arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Internship,
}

/// Seniority band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
    Executive,
}

/// Cadence a salary figure is quoted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryPeriod {
    Hourly,
    Monthly,
    Yearly,
}

/// Per-stage / overall data quality breakdown, attached to `raw` by the
/// Validation stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataQualityMetrics {
    pub completeness: f32,
    pub accuracy: f32,
    pub consistency: f32,
    pub validity: f32,
    pub uniqueness: f32,
    pub timeliness: f32,
    pub overall: f32,
}

impl DataQualityMetrics {
    /// Unweighted mean of the six dimensions, matching the Python original's
    /// `sum(dims) / len(dims)` rollup.
    pub fn from_dimensions(
        completeness: f32,
        accuracy: f32,
        consistency: f32,
        validity: f32,
        uniqueness: f32,
        timeliness: f32,
    ) -> Self {
        let overall =
            (completeness + accuracy + consistency + validity + uniqueness + timeliness) / 6.0;
        Self {
            completeness,
            accuracy,
            consistency,
            validity,
            uniqueness,
            timeliness,
            overall,
        }
    }
}

/// The unit of work flowing through discovery, enrichment, and storage.
///
/// Created by an adapter from a search or detail fetch, mutated only by
/// pipeline stages, immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    // Identity
    pub platform: String,
    pub external_id: Option<String>,
    pub job_id: String,
    pub content_hash: String,

    // Descriptive
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,

    // Compensation
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub salary_currency: Option<String>,
    pub salary_period: Option<SalaryPeriod>,

    // Classification
    pub job_type: Option<JobType>,
    pub experience_level: Option<ExperienceLevel>,
    pub remote: Option<bool>,

    // Temporal
    pub posted_date: Option<DateTime<Utc>>,
    pub scraped_date: Option<DateTime<Utc>>,
    pub application_deadline: Option<DateTime<Utc>>,

    // Quality
    pub quality_score: f32,
    pub confidence_score: f32,

    // Supplemented descriptive fields (original_source/data/models.py)
    pub requirements: Option<String>,
    pub benefits: Option<String>,
    pub company_size: Option<String>,
    pub company_industry: Option<String>,
    pub company_logo_url: Option<String>,
    pub skills: Vec<String>,

    // Opaque per-platform bag
    pub raw: Value,
}

impl JobRecord {
    /// Start a record from the essentials an adapter has at fetch time;
    /// identity fields are filled in by `finalize_identity`.
    pub fn new(platform: impl Into<String>, title: impl Into<String>, company: impl Into<String>, location: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            external_id: None,
            job_id: String::new(),
            content_hash: String::new(),
            title: title.into(),
            company: company.into(),
            location: location.into(),
            description: String::new(),
            url: url.into(),
            salary_min: None,
            salary_max: None,
            salary_currency: None,
            salary_period: None,
            job_type: None,
            experience_level: None,
            remote: None,
            posted_date: None,
            scraped_date: Some(Utc::now()),
            application_deadline: None,
            quality_score: 0.0,
            confidence_score: 0.0,
            requirements: None,
            benefits: None,
            company_size: None,
            company_industry: None,
            company_logo_url: None,
            skills: Vec::new(),
            raw: Value::Null,
        }
    }

    /// Compute and assign `job_id` and `content_hash`. Idempotent: calling
    /// twice on an unchanged record yields the same ids (S7 dedup property).
    pub fn finalize_identity(&mut self) {
        self.job_id = hashing::job_id(&self.platform, &self.url);
        self.content_hash = hashing::content_hash(
            &self.title,
            &self.company,
            &self.location,
            &self.description,
        );
    }

    /// `true` once both identity fields are non-empty (post-ETL invariant).
    pub fn has_identity(&self) -> bool {
        !self.job_id.is_empty() && !self.content_hash.is_empty()
    }

    /// Field-level survival check: non-empty `title` AND `company`.
    pub fn has_required_descriptive_fields(&self) -> bool {
        !self.title.trim().is_empty() && !self.company.trim().is_empty()
    }

    /// `salary_min <= salary_max` when both present.
    pub fn salary_range_is_consistent(&self) -> bool {
        match (self.salary_min, self.salary_max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        }
    }

    /// `posted_date <= scraped_date` when both present.
    pub fn dates_are_consistent(&self) -> bool {
        match (self.posted_date, self.scraped_date) {
            (Some(posted), Some(scraped)) => posted <= scraped,
            _ => true,
        }
    }

    /// Yearly-equivalent salary midpoint, used by enrichment heuristics.
    pub fn salary_midpoint(&self) -> Option<i64> {
        match (self.salary_min, self.salary_max) {
            (Some(min), Some(max)) => Some((min + max) / 2),
            (Some(min), None) => Some(min),
            (None, Some(max)) => Some(max),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> JobRecord {
        let mut job = JobRecord::new("indeed", "Engineer", "Acme", "Sydney", "https://indeed.com/1");
        job.description = "Build things".into();
        job
    }

    #[test]
    fn finalize_identity_is_idempotent() {
        let mut a = sample();
        let mut b = sample();
        a.finalize_identity();
        b.finalize_identity();
        assert_eq!(a.job_id, b.job_id);
        assert_eq!(a.content_hash, b.content_hash);
        assert!(a.has_identity());
    }

    #[test]
    fn salary_range_consistency() {
        let mut job = sample();
        job.salary_min = Some(100);
        job.salary_max = Some(50);
        assert!(!job.salary_range_is_consistent());
        job.salary_max = Some(150);
        assert!(job.salary_range_is_consistent());
    }

    #[test]
    fn required_descriptive_fields() {
        let mut job = sample();
        assert!(job.has_required_descriptive_fields());
        job.title = "  ".into();
        assert!(!job.has_required_descriptive_fields());
    }
}
