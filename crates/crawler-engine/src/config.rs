//! Top-level engine configuration: the numeric thresholds a caller is
//! expected to tune per deployment (cost limits, scheduler concurrency,
//! pipeline batching), gathered in one place with documented defaults.
//!
//! Library crates lower in the stack (`crawler-cost::CostLimits`,
//! `crawler-pipeline::PipelineConfig`) take their values as plain
//! constructor arguments and never read the environment themselves. This
//! struct is the one exception, matching
//! `openai_client::OpenAIClient::from_env`'s convenience constructor: a
//! caller wiring up a binary can build one `EngineConfig::from_env()` and
//! hand its pieces to the crates that need them.

use crawler_cost::CostLimits;
use crawler_pipeline::PipelineConfig;

const DEFAULT_SCHEDULER_MAX_CONCURRENT: usize = 5;
const DEFAULT_PLATFORM_FANOUT: usize = 3;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cost_limits: CostLimits,
    pub scheduler_max_concurrent: usize,
    pub platform_fanout: usize,
    pub pipeline: PipelineConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cost_limits: CostLimits::default(),
            scheduler_max_concurrent: DEFAULT_SCHEDULER_MAX_CONCURRENT,
            platform_fanout: DEFAULT_PLATFORM_FANOUT,
            pipeline: PipelineConfig::new("default"),
        }
    }
}

impl EngineConfig {
    /// Reads `CRAWLER_*` environment variables, falling back to
    /// [`Default`] for anything unset or unparsable. Never fails: a typo'd
    /// env var degrades to the documented default rather than aborting
    /// startup, since none of these thresholds are safety-critical.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cost_limits: CostLimits {
                hourly_limit: env_f64("CRAWLER_COST_HOURLY_LIMIT", defaults.cost_limits.hourly_limit),
                daily_limit: env_f64("CRAWLER_COST_DAILY_LIMIT", defaults.cost_limits.daily_limit),
                monthly_limit: env_f64("CRAWLER_COST_MONTHLY_LIMIT", defaults.cost_limits.monthly_limit),
            },
            scheduler_max_concurrent: env_usize("CRAWLER_SCHEDULER_MAX_CONCURRENT", defaults.scheduler_max_concurrent),
            platform_fanout: env_usize("CRAWLER_PLATFORM_FANOUT", defaults.platform_fanout),
            pipeline: PipelineConfig {
                batch_size: env_usize("CRAWLER_PIPELINE_BATCH_SIZE", defaults.pipeline.batch_size),
                max_workers: env_usize("CRAWLER_PIPELINE_MAX_WORKERS", defaults.pipeline.max_workers),
                ..defaults.pipeline
            },
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_thresholds() {
        let config = EngineConfig::default();
        assert_eq!(config.scheduler_max_concurrent, DEFAULT_SCHEDULER_MAX_CONCURRENT);
        assert_eq!(config.platform_fanout, DEFAULT_PLATFORM_FANOUT);
        assert_eq!(config.cost_limits.daily_limit, CostLimits::default().daily_limit);
    }

    #[test]
    fn from_env_falls_back_to_defaults_when_unset() {
        std::env::remove_var("CRAWLER_SCHEDULER_MAX_CONCURRENT");
        let config = EngineConfig::from_env();
        assert_eq!(config.scheduler_max_concurrent, DEFAULT_SCHEDULER_MAX_CONCURRENT);
    }
}
