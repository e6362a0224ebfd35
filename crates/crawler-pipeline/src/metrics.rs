//! Per-stage and overall processing metrics.
//!
//! Grounded on `original_source/crawler_engine/data/pipeline.py`'s
//! `ProcessingMetrics` (`success_rate`/`processing_time`/`throughput` as
//! derived properties over plain counters).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::stage::PipelineStage;

#[derive(Debug, Clone, Copy, Default)]
pub struct StageMetrics {
    pub processed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub total_time_secs: f64,
}

impl StageMetrics {
    pub fn avg_time_secs(&self) -> f64 {
        let total = self.processed + self.failed + self.skipped;
        if total == 0 {
            0.0
        } else {
            self.total_time_secs / total as f64
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    pub total: u64,
    pub processed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub start_time: Option<Instant>,
    pub end_time: Option<Instant>,
    pub stage_metrics: HashMap<&'static str, StageMetrics>,
}

impl PipelineMetrics {
    pub fn start(&mut self, total_items: u64) {
        self.total = total_items;
        self.start_time = Some(Instant::now());
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Records one stage's contribution for a batch. Stage-level counts
    /// are additive across batches; overall `processed`/`failed`/`skipped`
    /// are NOT derived from this (an item passes through many stages) —
    /// see [`PipelineMetrics::record_item_outcome`].
    pub fn record_stage(&mut self, stage: PipelineStage, elapsed: Duration, processed: u64, failed: u64, skipped: u64) {
        let entry = self.stage_metrics.entry(stage.as_str()).or_default();
        entry.processed += processed;
        entry.failed += failed;
        entry.skipped += skipped;
        entry.total_time_secs += elapsed.as_secs_f64();
    }

    /// Records one item's terminal outcome after it has run through every
    /// registered stage (or dropped out of one early).
    pub fn record_item_outcome(&mut self, status: crate::stage::ItemStatus) {
        use crate::stage::ItemStatus;
        match status {
            ItemStatus::Completed => self.processed += 1,
            ItemStatus::Failed => self.failed += 1,
            ItemStatus::Skipped => self.skipped += 1,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }

    pub fn processing_time(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    pub fn throughput(&self) -> f64 {
        let secs = self.processing_time().as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }
}
