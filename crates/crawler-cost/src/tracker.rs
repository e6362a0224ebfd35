//! Usage accounting and budget gate. See module-level docs in
//! `cost_tracker.py` in the supplement pack for the original shape;
//! `CostTracker` here keeps its public contract (`estimate`, `record`,
//! `check_limits`, `usage_stats`, `export`) but pushes persistence
//! failures into logs rather than the caller.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration as ChronoDuration, Timelike, Utc};
use crawler_domain::UsageRecord;
use tokio::sync::Mutex;

use crate::error::CostError;
use crate::journal::Journal;
use crate::pricing::PricingTable;

/// Fixed USD budget caps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostLimits {
    pub hourly_limit: f64,
    pub daily_limit: f64,
    pub monthly_limit: f64,
}

impl Default for CostLimits {
    fn default() -> Self {
        Self {
            hourly_limit: 10.0,
            daily_limit: 50.0,
            monthly_limit: 1000.0,
        }
    }
}

/// Result of `check_limits`: booleans plus remaining headroom, so a caller
/// can both gate the call and report how close it is to a cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitCheck {
    pub hourly_limit_ok: bool,
    pub daily_limit_ok: bool,
    pub monthly_limit_ok: bool,
    pub hourly_cost: f64,
    pub daily_cost: f64,
    pub monthly_cost: f64,
    pub hourly_remaining: f64,
    pub daily_remaining: f64,
    pub monthly_remaining: f64,
}

impl LimitCheck {
    pub fn all_ok(&self) -> bool {
        self.hourly_limit_ok && self.daily_limit_ok && self.monthly_limit_ok
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelBreakdown {
    pub requests: u64,
    pub tokens: u64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone)]
pub struct UsageStats {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_cost_usd: f64,
    pub total_tokens: u64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate_pct: f64,
    pub average_cost_per_request: f64,
    pub average_tokens_per_request: f64,
    pub model_breakdown: HashMap<String, ModelBreakdown>,
    pub request_type_breakdown: HashMap<String, ModelBreakdown>,
    pub platform_breakdown: HashMap<String, ModelBreakdown>,
    pub daily_costs: HashMap<String, f64>,
}

pub enum ExportFormat {
    Json,
    Csv,
}

struct State {
    records: Vec<UsageRecord>,
}

pub struct CostTracker {
    pricing: PricingTable,
    limits: Arc<Mutex<CostLimits>>,
    state: Arc<Mutex<State>>,
    journal: Journal,
}

impl CostTracker {
    /// `storage_path`, when set, points at the journal file. `None` keeps
    /// everything in memory for tests or a one-shot CLI invocation.
    pub async fn new(storage_path: Option<PathBuf>) -> Result<Self, CostError> {
        let journal = Journal::new(storage_path);
        let records = journal.load().await?;
        tracing::info!(records = records.len(), "cost tracker journal loaded");
        Ok(Self {
            pricing: PricingTable::default(),
            limits: Arc::new(Mutex::new(CostLimits::default())),
            state: Arc::new(Mutex::new(State { records })),
            journal,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            pricing: PricingTable::default(),
            limits: Arc::new(Mutex::new(CostLimits::default())),
            state: Arc::new(Mutex::new(State { records: Vec::new() })),
            journal: Journal::disabled(),
        }
    }

    pub async fn set_limits(&self, limits: CostLimits) {
        *self.limits.lock().await = limits;
        tracing::info!(?limits, "cost limits updated");
    }

    pub fn set_model_pricing(&mut self, model: impl Into<String>, pricing: crate::pricing::ModelPricing) {
        self.pricing.set_model(model, pricing);
    }

    /// Estimation never errors; an unparseable shape just returns 0 and
    /// logs rather than fail the call.
    pub fn estimate(
        &self,
        model: &str,
        tokens: u64,
        has_image: bool,
        input_tokens: Option<u64>,
        output_tokens: Option<u64>,
    ) -> f64 {
        self.pricing.estimate(model, tokens, has_image, input_tokens, output_tokens)
    }

    /// Append a usage record. Persistence errors are logged, never
    /// propagated — the in-memory ledger is always updated.
    pub async fn record(&self, record: UsageRecord) {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.records.push(record.clone());
            state.records.clone()
        };
        tracing::info!(
            model = %record.model,
            tokens = record.tokens,
            cost_usd = record.cost_usd,
            request_type = %record.request_type,
            success = record.success,
            "usage recorded"
        );
        if let Err(err) = self.journal.persist(&snapshot).await {
            tracing::error!(error = %err, "failed to persist usage journal");
        }
    }

    pub async fn hourly_cost(&self) -> f64 {
        let now = Utc::now();
        let start = now
            .with_minute(0)
            .and_then(|d| d.with_second(0))
            .and_then(|d| d.with_nanosecond(0))
            .unwrap_or(now);
        let end = start + ChronoDuration::hours(1);
        self.cost_in_period(start, end).await
    }

    pub async fn daily_cost(&self) -> f64 {
        let now = Utc::now();
        let start = now
            .with_hour(0)
            .and_then(|d| d.with_minute(0))
            .and_then(|d| d.with_second(0))
            .and_then(|d| d.with_nanosecond(0))
            .unwrap_or(now);
        let end = start + ChronoDuration::days(1);
        self.cost_in_period(start, end).await
    }

    pub async fn monthly_cost(&self) -> f64 {
        let now = Utc::now();
        let start = now
            .with_day(1)
            .and_then(|d| d.with_hour(0))
            .and_then(|d| d.with_minute(0))
            .and_then(|d| d.with_second(0))
            .and_then(|d| d.with_nanosecond(0))
            .unwrap_or(now);
        let (next_year, next_month) = if start.month() == 12 {
            (start.year() + 1, 1)
        } else {
            (start.year(), start.month() + 1)
        };
        let end = start
            .with_year(next_year)
            .and_then(|d| d.with_month(next_month))
            .unwrap_or(start + ChronoDuration::days(31));
        self.cost_in_period(start, end).await
    }

    async fn cost_in_period(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
        let state = self.state.lock().await;
        state
            .records
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp < end)
            .map(|r| r.cost_usd)
            .sum()
    }

    pub async fn check_limits(&self) -> LimitCheck {
        let limits = *self.limits.lock().await;
        let hourly = self.hourly_cost().await;
        let daily = self.daily_cost().await;
        let monthly = self.monthly_cost().await;
        LimitCheck {
            hourly_limit_ok: hourly < limits.hourly_limit,
            daily_limit_ok: daily < limits.daily_limit,
            monthly_limit_ok: monthly < limits.monthly_limit,
            hourly_cost: hourly,
            daily_cost: daily,
            monthly_cost: monthly,
            hourly_remaining: (limits.hourly_limit - hourly).max(0.0),
            daily_remaining: (limits.daily_limit - daily).max(0.0),
            monthly_remaining: (limits.monthly_limit - monthly).max(0.0),
        }
    }

    pub async fn usage_stats(&self, days: i64) -> UsageStats {
        let end = Utc::now();
        let start = end - ChronoDuration::days(days);

        let state = self.state.lock().await;
        let period: Vec<&UsageRecord> = state
            .records
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp <= end)
            .collect();

        let total_requests = period.len() as u64;
        let total_cost_usd: f64 = period.iter().map(|r| r.cost_usd).sum();
        let total_tokens: u64 = period.iter().map(|r| r.tokens).sum();
        let successful_requests = period.iter().filter(|r| r.success).count() as u64;
        let failed_requests = total_requests - successful_requests;

        let mut model_breakdown: HashMap<String, ModelBreakdown> = HashMap::new();
        let mut request_type_breakdown: HashMap<String, ModelBreakdown> = HashMap::new();
        let mut platform_breakdown: HashMap<String, ModelBreakdown> = HashMap::new();
        let mut daily_costs: HashMap<String, f64> = HashMap::new();

        for record in &period {
            accumulate(&mut model_breakdown, &record.model, record);
            accumulate(&mut request_type_breakdown, &record.request_type, record);
            accumulate(
                &mut platform_breakdown,
                record.platform.as_deref().unwrap_or("unknown"),
                record,
            );
            *daily_costs.entry(record.timestamp.format("%Y-%m-%d").to_string()).or_insert(0.0) +=
                record.cost_usd;
        }

        UsageStats {
            period_start: start,
            period_end: end,
            total_cost_usd,
            total_tokens,
            total_requests,
            successful_requests,
            failed_requests,
            success_rate_pct: if total_requests > 0 {
                successful_requests as f64 / total_requests as f64 * 100.0
            } else {
                0.0
            },
            average_cost_per_request: if total_requests > 0 {
                total_cost_usd / total_requests as f64
            } else {
                0.0
            },
            average_tokens_per_request: if total_requests > 0 {
                total_tokens as f64 / total_requests as f64
            } else {
                0.0
            },
            model_breakdown,
            request_type_breakdown,
            platform_breakdown,
            daily_costs,
        }
    }

    pub async fn export(&self, start: DateTime<Utc>, end: DateTime<Utc>, format: ExportFormat, to: &std::path::Path) -> Result<(), CostError> {
        let state = self.state.lock().await;
        let period: Vec<&UsageRecord> = state
            .records
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp <= end)
            .collect();

        match format {
            ExportFormat::Json => {
                let body = serde_json::to_string_pretty(&period)?;
                tokio::fs::write(to, body).await?;
            }
            ExportFormat::Csv => {
                let mut writer = csv::Writer::from_path(to)?;
                for record in &period {
                    writer.serialize(record)?;
                }
                writer.flush()?;
            }
        }
        tracing::info!(path = %to.display(), records = period.len(), "usage data exported");
        Ok(())
    }
}

fn accumulate(map: &mut HashMap<String, ModelBreakdown>, key: &str, record: &UsageRecord) {
    let entry = map.entry(key.to_string()).or_default();
    entry.requests += 1;
    entry.tokens += record.tokens;
    entry.cost_usd += record.cost_usd;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn budget_gate_refuses_when_daily_cost_would_exceed_limit() {
        let tracker = CostTracker::in_memory();
        tracker
            .set_limits(CostLimits {
                hourly_limit: 10.0,
                daily_limit: 1.00,
                monthly_limit: 1000.0,
            })
            .await;

        tracker
            .record(UsageRecord::new("gpt-4-vision-preview", 0, 0.995, "vision"))
            .await;

        let estimated = tracker.estimate("gpt-4-vision-preview", 0, true, Some(50), Some(50));
        assert!(estimated > 0.0);

        let check = tracker.check_limits().await;
        assert!(check.daily_limit_ok);
        assert!(check.daily_cost + estimated > 1.00);
    }

    #[tokio::test]
    async fn check_limits_flags_breach_directly() {
        let tracker = CostTracker::in_memory();
        tracker
            .set_limits(CostLimits {
                hourly_limit: 10.0,
                daily_limit: 1.00,
                monthly_limit: 1000.0,
            })
            .await;
        tracker
            .record(UsageRecord::new("gpt-4-vision-preview", 0, 0.995, "vision"))
            .await;
        tracker
            .record(UsageRecord::new("gpt-4-vision-preview", 0, 0.02, "vision"))
            .await;

        let check = tracker.check_limits().await;
        assert!(!check.daily_limit_ok);
        assert!(check.daily_remaining == 0.0);
    }

    #[tokio::test]
    async fn usage_stats_breaks_down_by_model_and_platform() {
        let tracker = CostTracker::in_memory();
        tracker
            .record(
                UsageRecord::new("gpt-4-turbo", 100, 0.01, "text")
                    .with_platform("linkedin"),
            )
            .await;
        tracker
            .record(UsageRecord::new("gpt-4-turbo", 100, 0.01, "text").failed("timeout"))
            .await;

        let stats = tracker.usage_stats(30).await;
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.successful_requests, 1);
        assert_eq!(stats.failed_requests, 1);
        assert_eq!(stats.model_breakdown.get("gpt-4-turbo").unwrap().requests, 2);
        assert_eq!(stats.platform_breakdown.get("linkedin").unwrap().requests, 1);
        assert_eq!(stats.platform_breakdown.get("unknown").unwrap().requests, 1);
    }
}
