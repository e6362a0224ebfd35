//! SQL-backed storage. Uses a `sqlx::SqlitePool` (SQLite's single-writer
//! concurrency model), with one process-wide write
//! lock shared across every write to tolerate SQLite's single-writer
//! reality under concurrent callers.
//!
//! Grounded on `original_source/crawler_engine/data/storage.py`'s
//! `DatabaseStorage` (table shape, index set, upsert-on-`job_id`) and
//! `packages/intelligent-crawler/src/storage/postgres.rs`'s runtime
//! `sqlx::query(...).bind(...)` style (no compile-time `query!` macro,
//! since this workspace has no reachable database at build time).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;

use crawler_domain::{
    ExperienceLevel, JobRecord, JobType, SalaryPeriod,
};

use crate::error::StorageError;
use crate::query::{FieldFilter, Query};
use crate::traits::{JobPatch, Storage};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT UNIQUE NOT NULL,
    external_id TEXT,
    content_hash TEXT NOT NULL,
    platform TEXT NOT NULL,
    title TEXT NOT NULL,
    company TEXT NOT NULL,
    location TEXT NOT NULL,
    description TEXT NOT NULL,
    url TEXT NOT NULL,
    salary_min INTEGER,
    salary_max INTEGER,
    salary_currency TEXT,
    salary_period TEXT,
    job_type TEXT,
    experience_level TEXT,
    remote INTEGER,
    posted_date TEXT,
    scraped_date TEXT,
    quality_score REAL NOT NULL DEFAULT 0,
    confidence_score REAL NOT NULL DEFAULT 0,
    raw_data TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_job_id ON jobs(job_id);
CREATE INDEX IF NOT EXISTS idx_jobs_platform ON jobs(platform);
CREATE INDEX IF NOT EXISTS idx_jobs_company ON jobs(company);
CREATE INDEX IF NOT EXISTS idx_jobs_location ON jobs(location);
CREATE INDEX IF NOT EXISTS idx_jobs_posted_date ON jobs(posted_date);
"#;

/// Relational backend over `jobs`, keyed by the unique `job_id` index.
pub struct RelationalBackend {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl RelationalBackend {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl Storage for RelationalBackend {
    async fn initialize(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("relational storage initialized");
        Ok(())
    }

    async fn store(&self, job: &JobRecord) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;
        let existing = sqlx::query("SELECT id FROM jobs WHERE job_id = ?1")
            .bind(&job.job_id)
            .fetch_optional(&self.pool)
            .await?;
        let is_new = existing.is_none();

        sqlx::query(
            r#"
            INSERT INTO jobs (
                job_id, external_id, content_hash, platform, title, company, location,
                description, url, salary_min, salary_max, salary_currency, salary_period,
                job_type, experience_level, remote, posted_date, scraped_date,
                quality_score, confidence_score, raw_data, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?21, CURRENT_TIMESTAMP
            )
            ON CONFLICT(job_id) DO UPDATE SET
                external_id = excluded.external_id,
                content_hash = excluded.content_hash,
                platform = excluded.platform,
                title = excluded.title,
                company = excluded.company,
                location = excluded.location,
                description = excluded.description,
                url = excluded.url,
                salary_min = excluded.salary_min,
                salary_max = excluded.salary_max,
                salary_currency = excluded.salary_currency,
                salary_period = excluded.salary_period,
                job_type = excluded.job_type,
                experience_level = excluded.experience_level,
                remote = excluded.remote,
                posted_date = excluded.posted_date,
                scraped_date = excluded.scraped_date,
                quality_score = excluded.quality_score,
                confidence_score = excluded.confidence_score,
                raw_data = excluded.raw_data,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&job.job_id)
        .bind(&job.external_id)
        .bind(&job.content_hash)
        .bind(&job.platform)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.description)
        .bind(&job.url)
        .bind(job.salary_min)
        .bind(job.salary_max)
        .bind(&job.salary_currency)
        .bind(job.salary_period.map(salary_period_str))
        .bind(job.job_type.map(job_type_str))
        .bind(job.experience_level.map(experience_level_str))
        .bind(job.remote.map(|b| b as i32))
        .bind(job.posted_date.map(|d| d.to_rfc3339()))
        .bind(job.scraped_date.map(|d| d.to_rfc3339()))
        .bind(job.quality_score)
        .bind(job.confidence_score)
        .bind(job.raw.to_string())
        .execute(&self.pool)
        .await?;

        Ok(is_new)
    }

    async fn retrieve(&self, query: &Query) -> Result<Vec<JobRecord>, StorageError> {
        // The query evaluator is shared with the file/cache backends
        // (`Query::matches`), so here we just pull every row and filter
        // in-process rather than duplicating the predicate as SQL.
        let rows = sqlx::query("SELECT * FROM jobs").fetch_all(&self.pool).await?;
        let mut jobs: Vec<JobRecord> = rows.iter().map(row_to_job).collect();
        jobs.retain(|job| query.matches(job));
        if let Some(limit) = query.limit {
            jobs.truncate(limit);
        }
        Ok(jobs)
    }

    async fn update(&self, query: &Query, patch: &JobPatch) -> Result<usize, StorageError> {
        if patch.is_empty() {
            return Ok(0);
        }
        let _guard = self.write_lock.lock().await;
        let rows = sqlx::query("SELECT * FROM jobs").fetch_all(&self.pool).await?;
        let mut affected = 0;
        for row in &rows {
            let mut job = row_to_job(row);
            if !query.matches(&job) {
                continue;
            }
            patch.apply(&mut job);
            sqlx::query(
                r#"UPDATE jobs SET title = ?1, company = ?2, location = ?3, description = ?4,
                   quality_score = ?5, confidence_score = ?6, updated_at = CURRENT_TIMESTAMP
                   WHERE job_id = ?7"#,
            )
            .bind(&job.title)
            .bind(&job.company)
            .bind(&job.location)
            .bind(&job.description)
            .bind(job.quality_score)
            .bind(job.confidence_score)
            .bind(&job.job_id)
            .execute(&self.pool)
            .await?;
            affected += 1;
        }
        Ok(affected)
    }

    async fn delete(&self, query: &Query) -> Result<usize, StorageError> {
        let _guard = self.write_lock.lock().await;
        let rows = sqlx::query("SELECT * FROM jobs").fetch_all(&self.pool).await?;
        let mut affected = 0;
        for row in &rows {
            let job = row_to_job(row);
            if !query.matches(&job) {
                continue;
            }
            sqlx::query("DELETE FROM jobs WHERE job_id = ?1")
                .bind(&job.job_id)
                .execute(&self.pool)
                .await?;
            affected += 1;
        }
        Ok(affected)
    }

    async fn count(&self, query: Option<&Query>) -> Result<usize, StorageError> {
        match query {
            None => {
                let row = sqlx::query("SELECT COUNT(*) as n FROM jobs").fetch_one(&self.pool).await?;
                Ok(row.get::<i64, _>("n") as usize)
            }
            Some(query) => Ok(self.retrieve(query).await?.len()),
        }
    }

    async fn cleanup(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }
}

fn salary_period_str(p: SalaryPeriod) -> &'static str {
    match p {
        SalaryPeriod::Hourly => "hourly",
        SalaryPeriod::Monthly => "monthly",
        SalaryPeriod::Yearly => "yearly",
    }
}

fn job_type_str(t: JobType) -> &'static str {
    match t {
        JobType::FullTime => "full-time",
        JobType::PartTime => "part-time",
        JobType::Contract => "contract",
        JobType::Temporary => "temporary",
        JobType::Internship => "internship",
    }
}

fn experience_level_str(e: ExperienceLevel) -> &'static str {
    match e {
        ExperienceLevel::Entry => "entry",
        ExperienceLevel::Mid => "mid",
        ExperienceLevel::Senior => "senior",
        ExperienceLevel::Executive => "executive",
    }
}

fn parse_salary_period(s: &str) -> Option<SalaryPeriod> {
    match s {
        "hourly" => Some(SalaryPeriod::Hourly),
        "monthly" => Some(SalaryPeriod::Monthly),
        "yearly" => Some(SalaryPeriod::Yearly),
        _ => None,
    }
}

fn parse_job_type(s: &str) -> Option<JobType> {
    match s {
        "full-time" => Some(JobType::FullTime),
        "part-time" => Some(JobType::PartTime),
        "contract" => Some(JobType::Contract),
        "temporary" => Some(JobType::Temporary),
        "internship" => Some(JobType::Internship),
        _ => None,
    }
}

fn parse_experience_level(s: &str) -> Option<ExperienceLevel> {
    match s {
        "entry" => Some(ExperienceLevel::Entry),
        "mid" => Some(ExperienceLevel::Mid),
        "senior" => Some(ExperienceLevel::Senior),
        "executive" => Some(ExperienceLevel::Executive),
        _ => None,
    }
}

fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> JobRecord {
    let raw_text: String = row.get("raw_data");
    let raw: Value = serde_json::from_str(&raw_text).unwrap_or(Value::Null);
    let posted_date: Option<String> = row.get("posted_date");
    let scraped_date: Option<String> = row.get("scraped_date");
    let salary_period: Option<String> = row.get("salary_period");
    let job_type: Option<String> = row.get("job_type");
    let experience_level: Option<String> = row.get("experience_level");
    let remote: Option<i32> = row.get("remote");

    JobRecord {
        platform: row.get("platform"),
        external_id: row.get("external_id"),
        job_id: row.get("job_id"),
        content_hash: row.get("content_hash"),
        title: row.get("title"),
        company: row.get("company"),
        location: row.get("location"),
        description: row.get("description"),
        url: row.get("url"),
        salary_min: row.get("salary_min"),
        salary_max: row.get("salary_max"),
        salary_currency: row.get("salary_currency"),
        salary_period: salary_period.and_then(|s| parse_salary_period(&s)),
        job_type: job_type.and_then(|s| parse_job_type(&s)),
        experience_level: experience_level.and_then(|s| parse_experience_level(&s)),
        remote: remote.map(|v| v != 0),
        posted_date: posted_date.and_then(|s| parse_rfc3339(&s)),
        scraped_date: scraped_date.and_then(|s| parse_rfc3339(&s)),
        application_deadline: None,
        quality_score: row.get("quality_score"),
        confidence_score: row.get("confidence_score"),
        requirements: None,
        benefits: None,
        company_size: None,
        company_industry: None,
        company_logo_url: None,
        skills: Vec::new(),
        raw,
    }
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawler_domain::JobRecord;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn backend() -> RelationalBackend {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let backend = RelationalBackend::new(pool);
        backend.initialize().await.unwrap();
        backend
    }

    fn job(job_id_seed: &str, salary_max: i64) -> JobRecord {
        let mut job = JobRecord::new("indeed", "Engineer", "Acme", "Sydney", job_id_seed);
        job.finalize_identity();
        job.salary_min = Some(100_000);
        job.salary_max = Some(salary_max);
        job
    }

    #[tokio::test]
    async fn upsert_by_job_id_keeps_one_row() {
        let backend = backend().await;
        let j1 = job("https://indeed.com/1", 120_000);
        let mut j2 = j1.clone();
        j2.salary_max = Some(150_000);

        assert!(backend.store(&j1).await.unwrap());
        assert!(!backend.store(&j2).await.unwrap());

        let query = Query::new().eq("job_id", &j1.job_id);
        assert_eq!(backend.count(Some(&query)).await.unwrap(), 1);
        let rows = backend.retrieve(&query).await.unwrap();
        assert_eq!(rows[0].salary_max, Some(150_000));
    }

    #[tokio::test]
    async fn delete_removes_matching_rows() {
        let backend = backend().await;
        let j1 = job("https://indeed.com/1", 120_000);
        backend.store(&j1).await.unwrap();

        let query = Query::new().eq("job_id", &j1.job_id);
        assert_eq!(backend.delete(&query).await.unwrap(), 1);
        assert_eq!(backend.count(None).await.unwrap(), 0);
    }
}
