//! Storage backends for job records: relational, file, and in-memory cache.
//!
//! Grounded on `packages/intelligent-crawler/src/storage/postgres.rs` (sqlx
//! query style), `packages/extraction/src/stores/memory.rs` (lock
//! discipline for an in-memory backend), and
//! `original_source/crawler_engine/data/{storage,cache}.py` for the
//! upsert-by-`job_id` and eviction-policy semantics.

pub mod cache;
pub mod error;
pub mod file;
pub mod query;
pub mod relational;
pub mod traits;

pub use cache::{CacheBackend, CacheConfig, CacheLevel, CacheStats, CacheStrategy};
pub use error::StorageError;
pub use file::{FileBackend, FileFormat};
pub use query::{FieldFilter, Query};
pub use relational::RelationalBackend;
pub use traits::{JobPatch, Storage};
