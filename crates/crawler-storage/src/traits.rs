//! Common CRUD contract every storage backend implements.
//! Grounded on `extraction::traits::store`'s split-trait-over-async-trait
//! shape, collapsed to one trait since every backend here stores the same
//! `JobRecord` type rather than three distinct cache kinds.

use async_trait::async_trait;

use crawler_domain::JobRecord;

use crate::error::StorageError;
use crate::query::Query;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn initialize(&self) -> Result<(), StorageError>;

    /// Upsert one record, keyed by `job_id`. Returns `true` if a new row
    /// was inserted, `false` if an existing row was updated.
    async fn store(&self, job: &JobRecord) -> Result<bool, StorageError>;

    /// Upsert a batch; same semantics as repeated `store` calls.
    async fn store_many(&self, jobs: &[JobRecord]) -> Result<Vec<bool>, StorageError> {
        let mut inserted = Vec::with_capacity(jobs.len());
        for job in jobs {
            inserted.push(self.store(job).await?);
        }
        Ok(inserted)
    }

    async fn retrieve(&self, query: &Query) -> Result<Vec<JobRecord>, StorageError>;

    /// Apply `patch` to every record matching `query`; returns affected count.
    async fn update(&self, query: &Query, patch: &JobPatch) -> Result<usize, StorageError>;

    async fn delete(&self, query: &Query) -> Result<usize, StorageError>;

    async fn count(&self, query: Option<&Query>) -> Result<usize, StorageError>;

    async fn exists(&self, query: &Query) -> Result<bool, StorageError> {
        Ok(self.count(Some(query)).await? > 0)
    }

    /// Backend-specific maintenance: vacuum a relational table, prune
    /// expired cache entries, and so on. A no-op for backends that don't
    /// need it.
    async fn cleanup(&self) -> Result<(), StorageError>;
}

/// A sparse set of field updates applied by `Storage::update`. Only the
/// fields actually used by the pipeline's patch operations are modeled;
/// unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub quality_score: Option<f32>,
    pub confidence_score: Option<f32>,
}

impl JobPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, job: &mut JobRecord) {
        if let Some(v) = &self.title {
            job.title = v.clone();
        }
        if let Some(v) = &self.company {
            job.company = v.clone();
        }
        if let Some(v) = &self.location {
            job.location = v.clone();
        }
        if let Some(v) = &self.description {
            job.description = v.clone();
        }
        if let Some(v) = self.quality_score {
            job.quality_score = v;
        }
        if let Some(v) = self.confidence_score {
            job.confidence_score = v;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.company.is_none()
            && self.location.is_none()
            && self.description.is_none()
            && self.quality_score.is_none()
            && self.confidence_score.is_none()
    }
}
