//! Stage identity and the per-item processor contract.
//!
//! Grounded on `original_source/crawler_engine/data/pipeline.py`'s
//! `PipelineStage` enum and `PipelineProcessor` abstract base
//! (`process`/`process_batch`), translated onto a single async trait.

use async_trait::async_trait;

use crawler_domain::JobRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Validation,
    Cleaning,
    Transformation,
    Enrichment,
    Deduplication,
    Storage,
    Export,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Validation => "validation",
            PipelineStage::Cleaning => "cleaning",
            PipelineStage::Transformation => "transformation",
            PipelineStage::Enrichment => "enrichment",
            PipelineStage::Deduplication => "deduplication",
            PipelineStage::Storage => "storage",
            PipelineStage::Export => "export",
        }
    }

    /// The canonical default order. `Transformation` and `Export` are
    /// optional; a pipeline only runs the stages it registers.
    pub fn default_order() -> &'static [PipelineStage] {
        &[
            PipelineStage::Validation,
            PipelineStage::Cleaning,
            PipelineStage::Transformation,
            PipelineStage::Enrichment,
            PipelineStage::Deduplication,
            PipelineStage::Storage,
            PipelineStage::Export,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Completed,
    Failed,
    Skipped,
}

/// The outcome of running one stage over one item. `data` carries the
/// (possibly mutated) record forward; `None` on a skip or failure drops
/// the item from the rest of the batch.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub status: ItemStatus,
    pub data: Option<JobRecord>,
    pub error: Option<String>,
}

impl StageOutcome {
    pub fn completed(job: JobRecord) -> Self {
        Self {
            status: ItemStatus::Completed,
            data: Some(job),
            error: None,
        }
    }

    pub fn failed(job: JobRecord, error: impl Into<String>) -> Self {
        Self {
            status: ItemStatus::Failed,
            data: Some(job),
            error: Some(error.into()),
        }
    }

    pub fn skipped(job: JobRecord, reason: impl Into<String>) -> Self {
        Self {
            status: ItemStatus::Skipped,
            data: Some(job),
            error: Some(reason.into()),
        }
    }
}

#[async_trait]
pub trait Processor: Send + Sync {
    fn stage(&self) -> PipelineStage;

    async fn process(&self, item: JobRecord) -> StageOutcome;

    /// Sequential per-item application; stage-level parallelism is the
    /// pipeline driver's responsibility (`max_workers`/`parallel_enabled`),
    /// not the processor's, so results preserve input order by construction.
    async fn process_batch(&self, batch: Vec<JobRecord>) -> Vec<StageOutcome> {
        let mut results = Vec::with_capacity(batch.len());
        for item in batch {
            results.push(self.process(item).await);
        }
        results
    }
}
