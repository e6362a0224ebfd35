//! Linear, pluggable ETL pipeline over job records.
//!
//! Records flow through a configurable chain of [`stage::Processor`]
//! stages (validation, cleaning, transformation, enrichment,
//! deduplication, storage, export), driven by [`pipeline::Pipeline`] with
//! bounded concurrency and periodic checkpointing.
//!
//! Grounded on `original_source/crawler_engine/data/pipeline.py` for the
//! stage/driver shape and `original_source/crawler_engine/data/processors.py`
//! for individual stage semantics.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod stage;
pub mod stages;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use metrics::{PipelineMetrics, StageMetrics};
pub use pipeline::Pipeline;
pub use stage::{ItemStatus, PipelineStage, Processor, StageOutcome};
pub use stages::{CleaningStage, DeduplicationStage, EnrichmentStage, ExportFormat, ExportStage, StorageStage, TransformationStage, ValidationStage};
