//! Engine-level error taxonomy: wraps the leaf errors from the crates it
//! orchestrates behind one umbrella, following the layering
//! `crawler_platform::error`/`crawler_storage::error` already use.

use thiserror::Error;

use crawler_domain::{BudgetExceededError, ValidationError};
use crawler_pipeline::PipelineError;
use crawler_storage::StorageError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    BudgetExceeded(#[from] BudgetExceededError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("no platform available to search")]
    NoPlatformsAvailable,
}
