//! Shared domain types for the job-listing crawler core.
//!
//! No component in this workspace owns these types exclusively; adapters
//! create `JobRecord`s, the pipeline mutates them, storage persists them.

pub mod error;
pub mod hashing;
pub mod job;
pub mod usage;

pub use error::{
    BlockedError, BudgetExceededError, NetworkError, ParseError, RateLimitError, TimeoutError,
    ValidationError,
};
pub use job::{DataQualityMetrics, ExperienceLevel, JobRecord, JobType, SalaryPeriod};
pub use usage::UsageRecord;
