//! Pipeline-wide configuration, per the ambient rule that every numeric
//! threshold is externally configurable with a documented default.
//! Grounded on `original_source/crawler_engine/data/pipeline.py`'s
//! `PipelineConfig`.

use std::path::PathBuf;

use crate::stage::PipelineStage;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub name: String,
    pub batch_size: usize,
    pub max_workers: usize,
    pub parallel_enabled: bool,
    pub checkpoint_interval: Option<u64>,
    pub checkpoint_path: Option<PathBuf>,
    pub stages: Vec<PipelineStage>,
    pub similarity_threshold: f32,
}

impl PipelineConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batch_size: 100,
            max_workers: 4,
            parallel_enabled: true,
            checkpoint_interval: Some(1000),
            checkpoint_path: None,
            stages: vec![
                PipelineStage::Validation,
                PipelineStage::Cleaning,
                PipelineStage::Transformation,
                PipelineStage::Deduplication,
                PipelineStage::Storage,
            ],
            similarity_threshold: 0.85,
        }
    }

    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    pub fn with_max_workers(mut self, n: usize) -> Self {
        self.max_workers = n;
        self
    }

    pub fn with_stages(mut self, stages: Vec<PipelineStage>) -> Self {
        self.stages = stages;
        self
    }

    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>, interval: u64) -> Self {
        self.checkpoint_path = Some(path.into());
        self.checkpoint_interval = Some(interval);
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }
}
