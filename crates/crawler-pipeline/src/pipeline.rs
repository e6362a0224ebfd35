//! The pipeline driver: runs a fixed stage chain over batches of records,
//! with bounded per-batch concurrency, periodic checkpointing, and
//! pause/resume/stop control.
//!
//! Grounded on `original_source/crawler_engine/data/pipeline.py`'s
//! `DataPipeline` (`process_batch`/`_save_checkpoint`/pause-resume flags),
//! translated onto `futures::stream::buffered` for the ordered
//! bounded-concurrency fan-out that `max_workers` describes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::stream::{self, StreamExt};

use crawler_domain::JobRecord;

use crate::checkpoint::{write_checkpoint, Checkpoint};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::metrics::PipelineMetrics;
use crate::stage::{ItemStatus, Processor};

pub struct Pipeline {
    config: PipelineConfig,
    stages: Vec<Arc<dyn Processor>>,
    metrics: Arc<Mutex<PipelineMetrics>>,
    paused: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, stages: Vec<Arc<dyn Processor>>) -> Self {
        Self {
            config,
            stages,
            metrics: Arc::new(Mutex::new(PipelineMetrics::default())),
            paused: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> PipelineMetrics {
        self.metrics.lock().unwrap().clone()
    }

    /// Runs every item through the registered stage chain in batches of
    /// `config.batch_size`. Stops early (without erroring) if [`Pipeline::stop`]
    /// is called from another task; blocks between batches while
    /// [`Pipeline::pause`] is in effect.
    pub async fn run(&self, items: Vec<JobRecord>) -> Result<PipelineMetrics, PipelineError> {
        {
            let mut metrics = self.metrics.lock().unwrap();
            metrics.start(items.len() as u64);
        }

        let mut since_checkpoint: u64 = 0;

        for batch in items.chunks(self.config.batch_size.max(1)) {
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }
            while self.paused.load(Ordering::SeqCst) && !self.stopped.load(Ordering::SeqCst) {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }

            let outcomes = self.run_batch(batch.to_vec()).await;
            for (status, _) in outcomes {
                self.metrics.lock().unwrap().record_item_outcome(status);
                since_checkpoint += 1;
            }

            if let Some(interval) = self.config.checkpoint_interval {
                if since_checkpoint >= interval {
                    self.checkpoint().await?;
                    since_checkpoint = 0;
                }
            }
        }

        self.metrics.lock().unwrap().finish();
        Ok(self.metrics())
    }

    /// Like [`Pipeline::run`], but also returns the records that survived
    /// the whole stage chain, in input order. Callers that need the
    /// transformed/deduplicated records themselves (not just counts) use
    /// this instead of `run`.
    pub async fn run_collecting(
        &self,
        items: Vec<JobRecord>,
    ) -> Result<(Vec<JobRecord>, PipelineMetrics), PipelineError> {
        {
            let mut metrics = self.metrics.lock().unwrap();
            metrics.start(items.len() as u64);
        }

        let mut since_checkpoint: u64 = 0;
        let mut survivors = Vec::new();

        for batch in items.chunks(self.config.batch_size.max(1)) {
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }
            while self.paused.load(Ordering::SeqCst) && !self.stopped.load(Ordering::SeqCst) {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }

            let outcomes = self.run_batch(batch.to_vec()).await;
            for (status, record) in outcomes {
                self.metrics.lock().unwrap().record_item_outcome(status);
                since_checkpoint += 1;
                if let Some(record) = record {
                    survivors.push(record);
                }
            }

            if let Some(interval) = self.config.checkpoint_interval {
                if since_checkpoint >= interval {
                    self.checkpoint().await?;
                    since_checkpoint = 0;
                }
            }
        }

        self.metrics.lock().unwrap().finish();
        Ok((survivors, self.metrics()))
    }

    async fn run_batch(&self, batch: Vec<JobRecord>) -> Vec<(ItemStatus, Option<JobRecord>)> {
        let concurrency = if self.config.parallel_enabled {
            self.config.max_workers.max(1)
        } else {
            1
        };

        let stages = self.stages.clone();
        let metrics = self.metrics.clone();

        stream::iter(batch.into_iter().map(move |item| {
            let stages = stages.clone();
            let metrics = metrics.clone();
            async move { run_item_through_stages(item, &stages, &metrics).await }
        }))
        .buffered(concurrency)
        .collect::<Vec<_>>()
        .await
    }

    async fn checkpoint(&self) -> Result<(), PipelineError> {
        let Some(path) = self.config.checkpoint_path.as_ref() else {
            return Ok(());
        };
        let metrics = self.metrics.lock().unwrap().clone();

        let mut counters = HashMap::new();
        for (stage, stage_metrics) in &metrics.stage_metrics {
            counters.insert(stage.to_string(), stage_metrics.processed);
        }

        let checkpoint = Checkpoint {
            pipeline_name: self.config.name.clone(),
            timestamp: chrono::Utc::now(),
            counters,
            processed_count: metrics.processed,
        };
        write_checkpoint(path, &checkpoint).await?;
        Ok(())
    }
}

async fn run_item_through_stages(
    mut item: JobRecord,
    stages: &[Arc<dyn Processor>],
    metrics: &Mutex<PipelineMetrics>,
) -> (ItemStatus, Option<JobRecord>) {
    for stage in stages {
        let start = Instant::now();
        let outcome = stage.process(item).await;
        let elapsed = start.elapsed();

        let (processed, failed, skipped) = match outcome.status {
            ItemStatus::Completed => (1, 0, 0),
            ItemStatus::Failed => (0, 1, 0),
            ItemStatus::Skipped => (0, 0, 1),
        };
        metrics
            .lock()
            .unwrap()
            .record_stage(stage.stage(), elapsed, processed, failed, skipped);

        match outcome.status {
            ItemStatus::Completed => {
                item = outcome.data.expect("completed outcome always carries data");
            }
            ItemStatus::Failed | ItemStatus::Skipped => {
                return (outcome.status, None);
            }
        }
    }
    (ItemStatus::Completed, Some(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{CleaningStage, DeduplicationStage, ValidationStage};

    fn job(n: usize) -> JobRecord {
        let mut job = JobRecord::new("indeed", format!("Engineer {n}"), "Acme", "Sydney", format!("https://indeed.com/{n}"));
        job.description = "Build distributed systems with Python".to_string();
        job
    }

    #[tokio::test]
    async fn runs_items_through_validation_cleaning_and_dedup() {
        let stages: Vec<Arc<dyn Processor>> = vec![
            Arc::new(ValidationStage::new()),
            Arc::new(CleaningStage::new()),
            Arc::new(DeduplicationStage::new(0.85)),
        ];
        let config = PipelineConfig::new("jobs").with_batch_size(2).with_max_workers(2);
        let pipeline = Pipeline::new(config, stages);

        let items = vec![job(1), job(2), job(3)];
        let metrics = pipeline.run(items).await.unwrap();

        assert_eq!(metrics.total, 3);
        assert_eq!(metrics.processed, 3);
        assert_eq!(metrics.failed, 0);
    }

    #[tokio::test]
    async fn duplicate_url_is_counted_as_failed_not_processed() {
        let stages: Vec<Arc<dyn Processor>> = vec![
            Arc::new(ValidationStage::new()),
            Arc::new(DeduplicationStage::new(0.85)),
        ];
        let config = PipelineConfig::new("jobs").with_batch_size(10).with_max_workers(1);
        let pipeline = Pipeline::new(config, stages);

        let mut dup = job(1);
        dup.url = "https://indeed.com/1".to_string();
        let mut original = job(1);
        original.url = "https://indeed.com/1".to_string();

        let metrics = pipeline.run(vec![original, dup]).await.unwrap();
        assert_eq!(metrics.processed, 1);
        assert_eq!(metrics.failed, 1);
    }

    #[tokio::test]
    async fn stop_halts_before_remaining_batches_run() {
        let stages: Vec<Arc<dyn Processor>> = vec![Arc::new(ValidationStage::new())];
        let config = PipelineConfig::new("jobs").with_batch_size(1).with_max_workers(1);
        let pipeline = Pipeline::new(config, stages);
        pipeline.stop();

        let metrics = pipeline.run(vec![job(1), job(2)]).await.unwrap();
        assert_eq!(metrics.processed, 0);
    }

    #[tokio::test]
    async fn run_collecting_returns_survivors_in_input_order() {
        let stages: Vec<Arc<dyn Processor>> = vec![
            Arc::new(ValidationStage::new()),
            Arc::new(DeduplicationStage::new(0.85)),
        ];
        let config = PipelineConfig::new("jobs").with_batch_size(10).with_max_workers(4);
        let pipeline = Pipeline::new(config, stages);

        let mut dup = job(1);
        dup.url = "https://indeed.com/1".to_string();
        let (survivors, metrics) = pipeline
            .run_collecting(vec![job(1), job(2), dup])
            .await
            .unwrap();

        assert_eq!(survivors.len(), 2);
        assert_eq!(survivors[0].url, "https://indeed.com/1");
        assert_eq!(survivors[1].url, "https://indeed.com/2");
        assert_eq!(metrics.failed, 1);
    }
}
