//! File-backed storage: a JSON array (or CSV) loaded whole into memory on
//! `initialize`, upserted in-memory keyed by `job_id`, and persisted whole
//! on every write ("auto-commit" style).
//!
//! Grounded on `original_source/crawler_engine/data/storage.py`'s
//! `FileStorage` (`_load_data`/`_save_data`, in-memory list keyed by
//! `job_id` with linear-scan upsert).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crawler_domain::JobRecord;

use crate::error::StorageError;
use crate::query::Query;
use crate::traits::{JobPatch, Storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Csv,
}

/// The CSV column order, one row per `JobRecord`.
const CSV_HEADER: [&str; 17] = [
    "job_id",
    "external_id",
    "platform",
    "title",
    "company",
    "location",
    "url",
    "description",
    "salary_min",
    "salary_max",
    "salary_currency",
    "salary_period",
    "job_type",
    "experience_level",
    "posted_date",
    "scraped_date",
    "raw",
];

pub struct FileBackend {
    path: PathBuf,
    format: FileFormat,
    jobs: Arc<RwLock<Vec<JobRecord>>>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            path: path.into(),
            format,
            jobs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    async fn persist(&self, jobs: &[JobRecord]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        match self.format {
            FileFormat::Json => {
                let body = serde_json::to_string_pretty(jobs)?;
                tokio::fs::write(&self.path, body).await?;
            }
            FileFormat::Csv => {
                let mut body = Vec::new();
                {
                    let mut writer = csv::Writer::from_writer(&mut body);
                    writer.write_record(CSV_HEADER)?;
                    for job in jobs {
                        writer.write_record(csv_row(job))?;
                    }
                    writer.flush()?;
                }
                tokio::fs::write(&self.path, body).await?;
            }
        }
        Ok(())
    }
}

fn csv_row(job: &JobRecord) -> [String; 17] {
    [
        job.job_id.clone(),
        job.external_id.clone().unwrap_or_default(),
        job.platform.clone(),
        job.title.clone(),
        job.company.clone(),
        job.location.clone(),
        job.url.clone(),
        job.description.clone(),
        job.salary_min.map(|v| v.to_string()).unwrap_or_default(),
        job.salary_max.map(|v| v.to_string()).unwrap_or_default(),
        job.salary_currency.clone().unwrap_or_default(),
        job.salary_period.map(|p| format!("{p:?}").to_lowercase()).unwrap_or_default(),
        job.job_type.map(|t| format!("{t:?}").to_lowercase()).unwrap_or_default(),
        job.experience_level.map(|e| format!("{e:?}").to_lowercase()).unwrap_or_default(),
        job.posted_date.map(|d| d.to_rfc3339()).unwrap_or_default(),
        job.scraped_date.map(|d| d.to_rfc3339()).unwrap_or_default(),
        job.raw.to_string(),
    ]
}

#[async_trait]
impl Storage for FileBackend {
    async fn initialize(&self) -> Result<(), StorageError> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            *self.jobs.write().await = Vec::new();
            return Ok(());
        }
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let loaded: Vec<JobRecord> = match self.format {
            FileFormat::Json => {
                if contents.trim().is_empty() {
                    Vec::new()
                } else {
                    serde_json::from_str(&contents)?
                }
            }
            FileFormat::Csv => Vec::new(), // CSV is export-only; never read back as source data.
        };
        tracing::info!(path = %self.path.display(), count = loaded.len(), "file storage initialized");
        *self.jobs.write().await = loaded;
        Ok(())
    }

    async fn store(&self, job: &JobRecord) -> Result<bool, StorageError> {
        let (snapshot, is_new) = {
            let mut jobs = self.jobs.write().await;
            let existing = jobs.iter_mut().find(|j| j.job_id == job.job_id);
            let is_new = match existing {
                Some(slot) => {
                    *slot = job.clone();
                    false
                }
                None => {
                    jobs.push(job.clone());
                    true
                }
            };
            (jobs.clone(), is_new)
        };
        self.persist(&snapshot).await?;
        Ok(is_new)
    }

    async fn retrieve(&self, query: &Query) -> Result<Vec<JobRecord>, StorageError> {
        let jobs = self.jobs.read().await;
        let mut matched: Vec<JobRecord> = jobs.iter().filter(|j| query.matches(j)).cloned().collect();
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn update(&self, query: &Query, patch: &JobPatch) -> Result<usize, StorageError> {
        if patch.is_empty() {
            return Ok(0);
        }
        let (snapshot, affected) = {
            let mut jobs = self.jobs.write().await;
            let mut affected = 0;
            for job in jobs.iter_mut() {
                if query.matches(job) {
                    patch.apply(job);
                    affected += 1;
                }
            }
            (jobs.clone(), affected)
        };
        self.persist(&snapshot).await?;
        Ok(affected)
    }

    async fn delete(&self, query: &Query) -> Result<usize, StorageError> {
        let (snapshot, removed) = {
            let mut jobs = self.jobs.write().await;
            let before = jobs.len();
            jobs.retain(|j| !query.matches(j));
            (jobs.clone(), before - jobs.len())
        };
        self.persist(&snapshot).await?;
        Ok(removed)
    }

    async fn count(&self, query: Option<&Query>) -> Result<usize, StorageError> {
        let jobs = self.jobs.read().await;
        Ok(match query {
            Some(q) => jobs.iter().filter(|j| q.matches(j)).count(),
            None => jobs.len(),
        })
    }

    async fn cleanup(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(url: &str) -> JobRecord {
        let mut job = JobRecord::new("indeed", "Engineer", "Acme", "Sydney", url);
        job.finalize_identity();
        job
    }

    #[tokio::test]
    async fn upsert_keyed_by_job_id_persists_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("jobs.json"), FileFormat::Json);
        backend.initialize().await.unwrap();

        let mut j = job("https://indeed.com/1");
        assert!(backend.store(&j).await.unwrap());
        j.title = "Senior Engineer".into();
        assert!(!backend.store(&j).await.unwrap());

        assert_eq!(backend.count(None).await.unwrap(), 1);

        // Reload from disk to confirm persistence happened.
        let reloaded = FileBackend::new(dir.path().join("jobs.json"), FileFormat::Json);
        reloaded.initialize().await.unwrap();
        assert_eq!(reloaded.count(None).await.unwrap(), 1);
        let rows = reloaded.retrieve(&Query::new()).await.unwrap();
        assert_eq!(rows[0].title, "Senior Engineer");
    }

    #[tokio::test]
    async fn delete_removes_matching_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("jobs.json"), FileFormat::Json);
        backend.initialize().await.unwrap();
        let j = job("https://indeed.com/1");
        backend.store(&j).await.unwrap();

        let deleted = backend.delete(&Query::new().eq("job_id", &j.job_id)).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(backend.count(None).await.unwrap(), 0);
    }
}
