use thiserror::Error;

/// Errors surfaced by [`crate::CostTracker`] itself (not by its callers'
/// budget checks, which return a structured [`crate::LimitCheck`] instead).
#[derive(Debug, Error)]
pub enum CostError {
    #[error("journal I/O failed: {0}")]
    Journal(#[from] std::io::Error),
    #[error("journal entry malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}
