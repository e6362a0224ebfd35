//! Domain-level error taxonomy shared across crawler crates.
//!
//! Each crate that owns a fallible seam defines its own error enum and wraps
//! these leaf variants with `#[from]`, following the layering in
//! `extraction::error` (a small set of leaf errors, one umbrella per crate).

use thiserror::Error;

/// Malformed input. Fatal to the call that produced it; never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("validation error: {reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// External signal that the caller is being throttled. Retryable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("rate limited{}", retry_after_secs.map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
pub struct RateLimitError {
    pub retry_after_secs: Option<u64>,
}

/// Transient network failure. Retryable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("network error: {message}")]
pub struct NetworkError {
    pub message: String,
}

/// A suspension point exceeded its deadline. Retryable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("timeout after {elapsed_ms}ms")]
pub struct TimeoutError {
    pub elapsed_ms: u64,
}

/// Platform presented a challenge/captcha or explicit block. Non-retryable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("blocked: {reason}")]
pub struct BlockedError {
    pub reason: String,
}

/// A cost gate refused the call. Fatal; never retried.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("budget exceeded: {scope} limit of {limit_usd:.2} USD would be exceeded (current {current_usd:.2}, estimated +{estimated_usd:.2})")]
pub struct BudgetExceededError {
    pub scope: String,
    pub limit_usd: f64,
    pub current_usd: f64,
    pub estimated_usd: f64,
}

/// Selector miss or unexpected DOM/response shape. Item-level; not retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("parse error: {message}")]
pub struct ParseError {
    pub message: String,
}
