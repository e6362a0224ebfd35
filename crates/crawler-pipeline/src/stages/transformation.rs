//! Salary normalization: converts hourly/monthly figures to a yearly
//! equivalent and non-USD currencies to USD using a fixed conversion
//! table.
//!
//! Grounded on `original_source/crawler_engine/data/processors.py`'s
//! `JobDataProcessor._normalize_salary`.

use async_trait::async_trait;

use crawler_domain::JobRecord;

use crate::stage::{PipelineStage, Processor, StageOutcome};

const HOURS_PER_YEAR: i64 = 2080;
const MONTHS_PER_YEAR: i64 = 12;

fn conversion_rate(currency: &str) -> f64 {
    match currency {
        "EUR" => 1.1,
        "GBP" => 1.3,
        "CAD" => 0.8,
        "AUD" => 0.7,
        _ => 1.0,
    }
}

pub struct TransformationStage;

impl TransformationStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TransformationStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Processor for TransformationStage {
    fn stage(&self) -> PipelineStage {
        PipelineStage::Transformation
    }

    async fn process(&self, mut job: JobRecord) -> StageOutcome {
        if job.salary_min.is_none() && job.salary_max.is_none() {
            return StageOutcome::completed(job);
        }

        use crawler_domain::SalaryPeriod;
        match job.salary_period {
            Some(SalaryPeriod::Hourly) => {
                job.salary_min = job.salary_min.map(|v| v * HOURS_PER_YEAR);
                job.salary_max = job.salary_max.map(|v| v * HOURS_PER_YEAR);
                job.salary_period = Some(SalaryPeriod::Yearly);
            }
            Some(SalaryPeriod::Monthly) => {
                job.salary_min = job.salary_min.map(|v| v * MONTHS_PER_YEAR);
                job.salary_max = job.salary_max.map(|v| v * MONTHS_PER_YEAR);
                job.salary_period = Some(SalaryPeriod::Yearly);
            }
            Some(SalaryPeriod::Yearly) | None => {}
        }

        if let Some(currency) = job.salary_currency.as_deref() {
            if currency != "USD" {
                let rate = conversion_rate(currency);
                job.salary_min = job.salary_min.map(|v| (v as f64 * rate) as i64);
                job.salary_max = job.salary_max.map(|v| (v as f64 * rate) as i64);
                job.salary_currency = Some("USD".to_string());
            }
        }

        StageOutcome::completed(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawler_domain::SalaryPeriod;

    fn job_with_salary(min: i64, max: i64, period: SalaryPeriod, currency: &str) -> JobRecord {
        let mut job = JobRecord::new("indeed", "Engineer", "Acme", "Sydney", "https://indeed.com/1");
        job.salary_min = Some(min);
        job.salary_max = Some(max);
        job.salary_period = Some(period);
        job.salary_currency = Some(currency.to_string());
        job
    }

    #[tokio::test]
    async fn hourly_converts_to_yearly() {
        let job = job_with_salary(40, 60, SalaryPeriod::Hourly, "USD");
        let outcome = TransformationStage::new().process(job).await;
        let job = outcome.data.unwrap();
        assert_eq!(job.salary_min, Some(40 * HOURS_PER_YEAR));
        assert_eq!(job.salary_max, Some(60 * HOURS_PER_YEAR));
        assert_eq!(job.salary_period, Some(SalaryPeriod::Yearly));
    }

    #[tokio::test]
    async fn eur_converts_to_usd() {
        let job = job_with_salary(50_000, 70_000, SalaryPeriod::Yearly, "EUR");
        let outcome = TransformationStage::new().process(job).await;
        let job = outcome.data.unwrap();
        assert_eq!(job.salary_min, Some(55_000));
        assert_eq!(job.salary_max, Some(77_000));
        assert_eq!(job.salary_currency, Some("USD".to_string()));
    }

    #[tokio::test]
    async fn missing_salary_is_a_no_op() {
        let job = JobRecord::new("indeed", "Engineer", "Acme", "Sydney", "https://indeed.com/1");
        let outcome = TransformationStage::new().process(job).await;
        assert_eq!(outcome.data.unwrap().salary_min, None);
    }
}
