//! Streaming progress reporting for a `search` call.
//!
//! Grounded on `original_source/crawler_engine/core/engine.py`'s
//! `search_jobs` async generator, which yields `{stage, message,
//! progress}` dicts as it moves through validation, analysis, platform
//! selection, searching, processing, and storage. Translated onto a
//! `tokio::sync::mpsc` channel: a caller that wants live updates passes a
//! sender into `CrawlerEngine::search_with_progress`; one that doesn't
//! care calls `CrawlerEngine::search` and gets only the final result.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Validation,
    Analysis,
    PlatformSelection,
    Searching,
    Processing,
    Storage,
    Completed,
}

impl ProgressStage {
    /// Matches the percentage markers in the original generator
    /// (`Searching` ramps from 40 to 80 as platforms complete and is
    /// reported per-platform by the caller rather than here).
    pub fn percent(self) -> u8 {
        match self {
            ProgressStage::Validation => 5,
            ProgressStage::Analysis => 15,
            ProgressStage::PlatformSelection => 25,
            ProgressStage::Searching => 40,
            ProgressStage::Processing => 85,
            ProgressStage::Storage => 95,
            ProgressStage::Completed => 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: ProgressStage,
    pub message: String,
    pub progress: u8,
}

impl ProgressUpdate {
    pub fn new(stage: ProgressStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            progress: stage.percent(),
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress;
        self
    }
}

pub type ProgressSender = tokio::sync::mpsc::UnboundedSender<ProgressUpdate>;

/// Sends if a sender was supplied; a missing receiver (channel closed) is
/// not an error for the search itself, so failures here are swallowed.
pub(crate) fn emit(sender: Option<&ProgressSender>, update: ProgressUpdate) {
    if let Some(sender) = sender {
        let _ = sender.send(update);
    }
}
