//! Pipeline-level error taxonomy. Stage failures are captured per-item in
//! [`crate::stage::StageOutcome`] and never raised; this enum covers the
//! pipeline's own I/O seams (checkpointing, export, storage delegation).

use thiserror::Error;

use crawler_storage::StorageError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("checkpoint I/O error: {0}")]
    Checkpoint(#[from] std::io::Error),
    #[error("export error: {0}")]
    Export(String),
}
