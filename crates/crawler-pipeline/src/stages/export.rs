//! Batch export of accumulated records to CSV or JSON on disk, with
//! optional chunking so a single file never grows past a configured row
//! count.
//!
//! Grounded on `original_source/crawler_engine/data/export.py`'s
//! `DataExporter` (`_export_to_csv`/`_export_to_json`, `chunk_size`).
//! Excel/Parquet formats from the original are dropped: no crate in this
//! stack covers them, and none of the other example repos pull one in
//! either (see DESIGN.md).

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crawler_domain::JobRecord;

use crate::error::PipelineError;
use crate::stage::{PipelineStage, Processor, StageOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// Fixed 17-column CSV order mandated by spec §6's external interface
/// contract, matching `crawler_storage::file::CSV_HEADER`.
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

/// Buffers every item it sees and writes them out on [`ExportStage::flush`],
/// splitting into multiple files if the buffer exceeds `chunk_size` rows.
/// `process` itself never fails an item; export failures surface only from
/// `flush`, since a single record can't be meaningfully rejected from a
/// whole-batch file write.
pub struct ExportStage {
    format: ExportFormat,
    output_dir: PathBuf,
    chunk_size: Option<usize>,
    buffer: Mutex<Vec<JobRecord>>,
}

impl ExportStage {
    pub fn new(output_dir: impl Into<PathBuf>, format: ExportFormat) -> Self {
        Self {
            format,
            output_dir: output_dir.into(),
            chunk_size: None,
            buffer: Mutex::new(Vec::new()),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Writes every buffered record to one or more files under
    /// `output_dir`, named `jobs_<index>.<ext>`, and clears the buffer.
    /// Returns the paths written.
    pub async fn flush(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let jobs = {
            let mut buf = self.buffer.lock().unwrap();
            std::mem::take(&mut *buf)
        };
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| PipelineError::Export(e.to_string()))?;

        let chunk_size = self.chunk_size.unwrap_or(jobs.len().max(1));
        let mut written = Vec::new();
        for (index, chunk) in jobs.chunks(chunk_size).enumerate() {
            let path = self.write_chunk(chunk, index)?;
            written.push(path);
        }
        Ok(written)
    }

    fn write_chunk(&self, chunk: &[JobRecord], index: usize) -> Result<PathBuf, PipelineError> {
        let ext = match self.format {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        };
        let path = self.output_dir.join(format!("jobs_{}.{}", index, ext));

        match self.format {
            ExportFormat::Csv => {
                let mut writer = csv::Writer::from_path(&path)
                    .map_err(|e| PipelineError::Export(e.to_string()))?;
                writer.write_record(CSV_HEADER).map_err(|e| PipelineError::Export(e.to_string()))?;
                for job in chunk {
                    writer
                        .write_record(csv_row(job))
                        .map_err(|e| PipelineError::Export(e.to_string()))?;
                }
                writer.flush().map_err(|e| PipelineError::Export(e.to_string()))?;
            }
            ExportFormat::Json => {
                let body = serde_json::to_string_pretty(chunk)
                    .map_err(|e| PipelineError::Export(e.to_string()))?;
                std::fs::write(&path, body).map_err(|e| PipelineError::Export(e.to_string()))?;
            }
        }

        Ok(path)
    }
}

#[async_trait]
impl Processor for ExportStage {
    fn stage(&self) -> PipelineStage {
        PipelineStage::Export
    }

    async fn process(&self, job: JobRecord) -> StageOutcome {
        self.buffer.lock().unwrap().push(job.clone());
        StageOutcome::completed(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(n: usize) -> JobRecord {
        let mut job = JobRecord::new("indeed", format!("Engineer {n}"), "Acme", "Sydney", format!("https://indeed.com/{n}"));
        job.finalize_identity();
        job
    }

    #[tokio::test]
    async fn flush_writes_one_csv_file_below_chunk_size() {
        let dir = tempfile::tempdir().unwrap();
        let stage = ExportStage::new(dir.path(), ExportFormat::Csv);
        for i in 0..3 {
            stage.process(job(i)).await;
        }
        let written = stage.flush().await.unwrap();
        assert_eq!(written.len(), 1);
        assert!(tokio::fs::read_to_string(&written[0]).await.unwrap().contains("Engineer 0"));
    }

    #[tokio::test]
    async fn flush_splits_into_multiple_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let stage = ExportStage::new(dir.path(), ExportFormat::Json).with_chunk_size(2);
        for i in 0..5 {
            stage.process(job(i)).await;
        }
        let written = stage.flush().await.unwrap();
        assert_eq!(written.len(), 3);
    }

    #[tokio::test]
    async fn flush_with_no_buffered_items_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let stage = ExportStage::new(dir.path(), ExportFormat::Csv);
        assert!(stage.flush().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn csv_header_matches_the_seventeen_column_contract() {
        let dir = tempfile::tempdir().unwrap();
        let stage = ExportStage::new(dir.path(), ExportFormat::Csv);
        stage.process(job(0)).await;
        let written = stage.flush().await.unwrap();
        let body = tokio::fs::read_to_string(&written[0]).await.unwrap();
        let header = body.lines().next().unwrap();
        assert_eq!(
            header,
            "job_id,external_id,platform,title,company,location,url,description,salary_min,salary_max,salary_currency,salary_period,job_type,experience_level,posted_date,scraped_date,raw"
        );
    }
}
