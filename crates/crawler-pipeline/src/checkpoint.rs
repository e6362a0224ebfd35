//! Atomic checkpoint writes: every `checkpoint_interval` completed items,
//! the pipeline snapshots its counters to `checkpoint_path` via
//! write-then-rename so a crash mid-write never leaves a torn file.
//!
//! Grounded on `original_source/crawler_engine/data/pipeline.py`'s
//! `_save_checkpoint`/`_load_checkpoint`.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub pipeline_name: String,
    pub timestamp: DateTime<Utc>,
    pub counters: HashMap<String, u64>,
    pub processed_count: u64,
}

pub async fn write_checkpoint(path: &Path, checkpoint: &Checkpoint) -> std::io::Result<()> {
    let body = serde_json::to_string_pretty(checkpoint)?;
    let tmp_path = path.with_extension("tmp");
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&tmp_path, body).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

pub async fn read_checkpoint(path: &Path) -> std::io::Result<Option<Checkpoint>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(None);
    }
    let body = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&body).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");

        let mut counters = HashMap::new();
        counters.insert("validation".to_string(), 10);

        let checkpoint = Checkpoint {
            pipeline_name: "jobs".to_string(),
            timestamp: Utc::now(),
            counters,
            processed_count: 10,
        };
        write_checkpoint(&path, &checkpoint).await.unwrap();

        let loaded = read_checkpoint(&path).await.unwrap().unwrap();
        assert_eq!(loaded.processed_count, 10);
        assert_eq!(loaded.pipeline_name, "jobs");
    }

    #[tokio::test]
    async fn missing_checkpoint_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(read_checkpoint(&path).await.unwrap().is_none());
    }
}
