//! URL, content-hash, and near-duplicate detection.
//!
//! Grounded on `original_source/crawler_engine/data/processors.py`'s
//! `DuplicateRemover` (`_calculate_content_hash`/`_is_similar_content`/
//! `_calculate_similarity`). Content hashing reuses
//! [`crawler_domain::JobRecord::content_hash`], already computed by the
//! adapter layer's `finalize_identity`, rather than recomputing it here.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crawler_domain::JobRecord;

use crate::stage::{PipelineStage, Processor, StageOutcome};

/// Signature cache is trimmed back to this many entries once it exceeds
/// [`SIGNATURE_CAP`], keeping only the most recently seen.
const SIGNATURE_CAP: usize = 10_000;
const SIGNATURE_RETAIN: usize = 5_000;

struct Seen {
    urls: HashSet<String>,
    hashes: HashSet<String>,
    content: Vec<String>,
}

pub struct DeduplicationStage {
    similarity_threshold: f32,
    seen: Mutex<Seen>,
}

impl DeduplicationStage {
    pub fn new(similarity_threshold: f32) -> Self {
        Self {
            similarity_threshold,
            seen: Mutex::new(Seen {
                urls: HashSet::new(),
                hashes: HashSet::new(),
                content: Vec::new(),
            }),
        }
    }

    /// Forgets every URL, hash, and content signature seen so far.
    pub fn clear(&self) {
        let mut seen = self.seen.lock().unwrap();
        seen.urls.clear();
        seen.hashes.clear();
        seen.content.clear();
    }

    fn jaccard(a: &str, b: &str) -> f32 {
        let words_a: HashSet<&str> = a.split_whitespace().collect();
        let words_b: HashSet<&str> = b.split_whitespace().collect();
        if words_a.is_empty() && words_b.is_empty() {
            return 1.0;
        }
        let intersection = words_a.intersection(&words_b).count();
        let union = words_a.union(&words_b).count();
        if union == 0 {
            0.0
        } else {
            intersection as f32 / union as f32
        }
    }
}

#[async_trait]
impl Processor for DeduplicationStage {
    fn stage(&self) -> PipelineStage {
        PipelineStage::Deduplication
    }

    async fn process(&self, job: JobRecord) -> StageOutcome {
        let mut seen = self.seen.lock().unwrap();

        if !job.url.is_empty() {
            if seen.urls.contains(&job.url) {
                return StageOutcome::failed(job, format!("duplicate url: {}", job.url));
            }
        }

        if !job.content_hash.is_empty() && seen.hashes.contains(&job.content_hash) {
            return StageOutcome::failed(job, format!("duplicate content hash: {}", job.content_hash));
        }

        let signature = format!("{} {} {}", job.title, job.company, job.description).to_lowercase();
        for existing in &seen.content {
            if Self::jaccard(&signature, existing) >= self.similarity_threshold {
                return StageOutcome::failed(job, "near-duplicate content");
            }
        }

        if !job.url.is_empty() {
            seen.urls.insert(job.url.clone());
        }
        if !job.content_hash.is_empty() {
            seen.hashes.insert(job.content_hash.clone());
        }
        seen.content.push(signature);
        if seen.content.len() > SIGNATURE_CAP {
            let drop_count = seen.content.len() - SIGNATURE_RETAIN;
            seen.content.drain(0..drop_count);
        }

        StageOutcome::completed(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(url: &str, title: &str, description: &str) -> JobRecord {
        let mut job = JobRecord::new("indeed", title, "Acme", "Sydney", url);
        job.description = description.to_string();
        job.finalize_identity();
        job
    }

    #[tokio::test]
    async fn second_identical_url_is_rejected() {
        let stage = DeduplicationStage::new(0.85);
        let first = stage.process(job("https://indeed.com/1", "Engineer", "Build things")).await;
        assert_eq!(first.status, crate::stage::ItemStatus::Completed);
        let second = stage.process(job("https://indeed.com/1", "Different title", "Different")).await;
        assert_eq!(second.status, crate::stage::ItemStatus::Failed);
    }

    #[tokio::test]
    async fn near_duplicate_description_is_rejected() {
        let stage = DeduplicationStage::new(0.5);
        let first = stage
            .process(job("https://indeed.com/1", "Senior Engineer", "build distributed systems at scale"))
            .await;
        assert_eq!(first.status, crate::stage::ItemStatus::Completed);
        let second = stage
            .process(job("https://indeed.com/2", "Senior Engineer", "build distributed systems at scale today"))
            .await;
        assert_eq!(second.status, crate::stage::ItemStatus::Failed);
    }

    #[tokio::test]
    async fn exact_threshold_match_counts_as_a_duplicate() {
        // Signatures are "<title> acme <description>" (company is fixed to
        // "Acme" by the `job` helper). "a acme b" vs "a acme b c":
        // intersection {a, acme, b} = 3, union {a, acme, b, c} = 4 -> 0.75.
        let stage = DeduplicationStage::new(0.75);
        let first = stage.process(job("https://indeed.com/1", "a", "b")).await;
        assert_eq!(first.status, crate::stage::ItemStatus::Completed);
        let second = stage.process(job("https://indeed.com/2", "a", "b c")).await;
        assert_eq!(second.status, crate::stage::ItemStatus::Failed);
    }

    #[tokio::test]
    async fn distinct_jobs_both_complete() {
        let stage = DeduplicationStage::new(0.85);
        let first = stage.process(job("https://indeed.com/1", "Engineer", "Build things")).await;
        let second = stage.process(job("https://linkedin.com/2", "Designer", "Make pixels pretty")).await;
        assert_eq!(first.status, crate::stage::ItemStatus::Completed);
        assert_eq!(second.status, crate::stage::ItemStatus::Completed);
    }
}
