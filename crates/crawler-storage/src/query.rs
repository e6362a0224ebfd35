//! A backend-agnostic job query: a dictionary of per-field filters with
//! operator suffixes. Each backend interprets the same
//! `Query` — the relational backend compiles it to a parameterized `WHERE`
//! clause, the memory/file backends evaluate it directly against records.

use std::collections::HashMap;

use crawler_domain::JobRecord;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldFilter {
    /// Equality. Used for identifiers (`job_id`, `platform`, `external_id`).
    Eq(String),
    /// Greater-than-or-equal. Numeric fields compare as `i64`; date fields
    /// compare as RFC 3339 strings.
    Gte(String),
    /// Less-than-or-equal, mirroring `Gte`.
    Lte(String),
    /// Case-insensitive substring match, for free-text fields.
    Contains(String),
}

#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: HashMap<String, FieldFilter>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), FieldFilter::Eq(value.into()));
        self
    }

    pub fn gte(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), FieldFilter::Gte(value.into()));
        self
    }

    pub fn lte(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), FieldFilter::Lte(value.into()));
        self
    }

    pub fn contains(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), FieldFilter::Contains(value.into()));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Evaluate every filter against a record's known fields. Unknown
    /// field names never match — a query against a typo'd field returns
    /// nothing rather than panicking.
    pub fn matches(&self, job: &JobRecord) -> bool {
        self.filters.iter().all(|(field, filter)| field_matches(job, field, filter))
    }
}

fn field_matches(job: &JobRecord, field: &str, filter: &FieldFilter) -> bool {
    match field {
        "job_id" => str_filter(&job.job_id, filter),
        "platform" => str_filter(&job.platform, filter),
        "company" => str_filter(&job.company, filter),
        "location" => str_filter(&job.location, filter),
        "title" => str_filter(&job.title, filter),
        "url" => str_filter(&job.url, filter),
        "content_hash" => str_filter(&job.content_hash, filter),
        "external_id" => job.external_id.as_deref().is_some_and(|v| str_filter(v, filter)),
        "posted_date" => job
            .posted_date
            .map(|d| str_filter(&d.to_rfc3339(), filter))
            .unwrap_or(false),
        "salary_min" => job.salary_min.is_some_and(|v| int_filter(v, filter)),
        "salary_max" => job.salary_max.is_some_and(|v| int_filter(v, filter)),
        _ => false,
    }
}

fn str_filter(value: &str, filter: &FieldFilter) -> bool {
    match filter {
        FieldFilter::Eq(target) => value == target,
        FieldFilter::Gte(target) => value >= target.as_str(),
        FieldFilter::Lte(target) => value <= target.as_str(),
        FieldFilter::Contains(target) => value.to_lowercase().contains(&target.to_lowercase()),
    }
}

fn int_filter(value: i64, filter: &FieldFilter) -> bool {
    let parsed: Option<i64> = match filter {
        FieldFilter::Eq(t) | FieldFilter::Gte(t) | FieldFilter::Lte(t) | FieldFilter::Contains(t) => t.parse().ok(),
    };
    let Some(target) = parsed else { return false };
    match filter {
        FieldFilter::Eq(_) => value == target,
        FieldFilter::Gte(_) => value >= target,
        FieldFilter::Lte(_) => value <= target,
        FieldFilter::Contains(_) => value == target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> JobRecord {
        let mut job = JobRecord::new("indeed", "Engineer", "Acme", "Sydney", "https://indeed.com/1");
        job.salary_min = Some(100_000);
        job.finalize_identity();
        job
    }

    #[test]
    fn eq_filter_matches_exact_field() {
        let job = sample();
        let query = Query::new().eq("platform", "indeed");
        assert!(query.matches(&job));
        let query = Query::new().eq("platform", "linkedin");
        assert!(!query.matches(&job));
    }

    #[test]
    fn gte_filter_on_salary() {
        let job = sample();
        assert!(Query::new().gte("salary_min", "50000").matches(&job));
        assert!(!Query::new().gte("salary_min", "200000").matches(&job));
    }

    #[test]
    fn contains_filter_is_case_insensitive() {
        let job = sample();
        assert!(Query::new().contains("company", "ACME").matches(&job));
    }

    #[test]
    fn unknown_field_never_matches() {
        let job = sample();
        assert!(!Query::new().eq("not_a_field", "x").matches(&job));
    }
}
