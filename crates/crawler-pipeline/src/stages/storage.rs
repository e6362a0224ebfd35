//! Terminal persistence stage: hands the record to a
//! [`crawler_storage::Storage`] backend.
//!
//! Grounded on `original_source/crawler_engine/data/pipeline.py`'s storage
//! stage wiring, where the last registered processor is the sink.

use std::sync::Arc;

use async_trait::async_trait;

use crawler_domain::JobRecord;
use crawler_storage::Storage;

use crate::stage::{PipelineStage, Processor, StageOutcome};

pub struct StorageStage {
    storage: Arc<dyn Storage>,
}

impl StorageStage {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Processor for StorageStage {
    fn stage(&self) -> PipelineStage {
        PipelineStage::Storage
    }

    async fn process(&self, job: JobRecord) -> StageOutcome {
        match self.storage.store(&job).await {
            Ok(_) => StageOutcome::completed(job),
            Err(err) => StageOutcome::failed(job, err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawler_storage::{FileBackend, FileFormat};

    #[tokio::test]
    async fn stores_a_valid_record() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FileBackend::new(dir.path().join("jobs.json"), FileFormat::Json));
        backend.initialize().await.unwrap();

        let mut job = JobRecord::new("indeed", "Engineer", "Acme", "Sydney", "https://indeed.com/1");
        job.finalize_identity();

        let stage = StorageStage::new(backend);
        let outcome = stage.process(job).await;
        assert_eq!(outcome.status, crate::stage::ItemStatus::Completed);
    }
}
