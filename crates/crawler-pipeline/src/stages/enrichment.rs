//! Rule-based enrichment: splits location into city/region, tags
//! well-known employers, and derives a coarse salary level from the job
//! title.
//!
//! Grounded on `original_source/crawler_engine/data/processors.py`'s
//! `DataEnricher` (`_enrich_location`/`_enrich_company`/`_enrich_salary`).

use async_trait::async_trait;

use crawler_domain::JobRecord;

use crate::stage::{PipelineStage, Processor, StageOutcome};

const TECH_GIANTS: &[&str] = &["google", "microsoft", "apple", "amazon", "facebook", "meta"];

fn enrich_location(job: &mut JobRecord) {
    if job.location.is_empty() {
        return;
    }
    let parts: Vec<&str> = job.location.splitn(2, ',').collect();
    if parts.len() == 2 {
        set_raw_field(job, "city", parts[0].trim());
        set_raw_field(job, "state_country", parts[1].trim());
    }
}

fn enrich_company(job: &mut JobRecord) {
    if job.company.is_empty() {
        return;
    }
    let lower = job.company.to_lowercase();
    if TECH_GIANTS.iter().any(|name| lower.contains(name)) {
        set_raw_field(job, "company_type", "tech_giant");
        set_raw_field(job, "estimated_size", "large");
    }
}

fn enrich_salary(job: &mut JobRecord) {
    let lower = job.title.to_lowercase();
    let level = if lower.contains("senior") || lower.contains("lead") {
        "senior"
    } else if lower.contains("junior") || lower.contains("entry") {
        "junior"
    } else {
        "mid"
    };
    set_raw_field(job, "salary_level", level);
}

fn set_raw_field(job: &mut JobRecord, key: &str, value: &str) {
    if !job.raw.is_object() {
        job.raw = serde_json::json!({});
    }
    if let serde_json::Value::Object(ref mut map) = job.raw {
        map.insert(key.to_string(), serde_json::Value::String(value.to_string()));
    }
}

pub struct EnrichmentStage;

impl EnrichmentStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EnrichmentStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Processor for EnrichmentStage {
    fn stage(&self) -> PipelineStage {
        PipelineStage::Enrichment
    }

    async fn process(&self, mut job: JobRecord) -> StageOutcome {
        enrich_location(&mut job);
        enrich_company(&mut job);
        enrich_salary(&mut job);
        StageOutcome::completed(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn splits_location_into_city_and_region() {
        let job = JobRecord::new("indeed", "Engineer", "Acme", "Sydney, NSW", "https://indeed.com/1");
        let outcome = EnrichmentStage::new().process(job).await;
        let job = outcome.data.unwrap();
        assert_eq!(job.raw.get("city").and_then(|v| v.as_str()), Some("Sydney"));
        assert_eq!(job.raw.get("state_country").and_then(|v| v.as_str()), Some("NSW"));
    }

    #[tokio::test]
    async fn tags_tech_giant_companies() {
        let job = JobRecord::new("indeed", "Engineer", "Google", "Sydney", "https://indeed.com/1");
        let outcome = EnrichmentStage::new().process(job).await;
        let job = outcome.data.unwrap();
        assert_eq!(job.raw.get("company_type").and_then(|v| v.as_str()), Some("tech_giant"));
    }

    #[tokio::test]
    async fn derives_salary_level_from_title() {
        let job = JobRecord::new("indeed", "Senior Engineer", "Acme", "Sydney", "https://indeed.com/1");
        let outcome = EnrichmentStage::new().process(job).await;
        let job = outcome.data.unwrap();
        assert_eq!(job.raw.get("salary_level").and_then(|v| v.as_str()), Some("senior"));
    }
}
