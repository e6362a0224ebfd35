//! Adapter-level error taxonomy. A small set of leaf
//! errors plus one umbrella, following `crawler_cost::client::ModelError`.

use thiserror::Error;

use crawler_domain::{BlockedError, NetworkError, ParseError, RateLimitError, TimeoutError, ValidationError};

#[derive(Debug, Error, Clone)]
pub enum PlatformError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
    #[error(transparent)]
    Blocked(#[from] BlockedError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl PlatformError {
    /// Network, timeout, and rate-limit errors are
    /// retryable; validation, blocked, and parse errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlatformError::Network(_) | PlatformError::Timeout(_) | PlatformError::RateLimit(_))
    }
}
