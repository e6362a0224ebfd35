//! On-disk usage journal, capped at the most recent 1000 records.
//!
//! Grounded on `_load_usage_records`/`_save_usage_record` in
//! `original_source/crawler_engine/ai/cost_tracker.py`: a single JSON file
//! holding an array, read whole on startup and rewritten whole on every
//! append (acceptable given the bounded size).

use std::path::PathBuf;

use crawler_domain::UsageRecord;

use crate::error::CostError;

pub const JOURNAL_CAP: usize = 1000;

#[derive(Debug, Clone)]
pub struct Journal {
    path: Option<PathBuf>,
}

impl Journal {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Replay the journal into memory. An absent file or a disabled
    /// journal yields an empty list rather than an error.
    pub async fn load(&self) -> Result<Vec<UsageRecord>, CostError> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }
        let contents = tokio::fs::read_to_string(path).await?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<UsageRecord> = serde_json::from_str(&contents)?;
        Ok(records)
    }

    /// Persist the full (already-capped) in-memory record list. A no-op
    /// when the journal has no backing path.
    pub async fn persist(&self, records: &[UsageRecord]) -> Result<(), CostError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let capped: &[UsageRecord] = if records.len() > JOURNAL_CAP {
            &records[records.len() - JOURNAL_CAP..]
        } else {
            records
        };
        let body = serde_json::to_string_pretty(capped)?;
        tokio::fs::write(path, body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: u32) -> UsageRecord {
        UsageRecord::new("gpt-4-turbo".into(), n as u64, 0.01, "text".into())
    }

    #[tokio::test]
    async fn round_trips_records() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(Some(dir.path().join("usage.json")));

        let records: Vec<UsageRecord> = (0..5).map(record).collect();
        journal.persist(&records).await.unwrap();

        let loaded = journal.load().await.unwrap();
        assert_eq!(loaded.len(), 5);
        assert_eq!(loaded[0].tokens, 0);
    }

    #[tokio::test]
    async fn persist_caps_at_1000_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(Some(dir.path().join("usage.json")));

        let records: Vec<UsageRecord> = (0..1500).map(record).collect();
        journal.persist(&records).await.unwrap();

        let loaded = journal.load().await.unwrap();
        assert_eq!(loaded.len(), JOURNAL_CAP);
        assert_eq!(loaded[0].tokens, 500);
        assert_eq!(loaded.last().unwrap().tokens, 1499);
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(Some(dir.path().join("does-not-exist.json")));
        assert!(journal.load().await.unwrap().is_empty());
    }
}
