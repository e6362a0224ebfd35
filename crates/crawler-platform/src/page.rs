//! The `Page` capability adapters scrape over. Adapters
//! depend only on this trait; they never manage a browser's lifetime.
//!
//! Grounded on `packages/intelligent-crawler/src/traits.rs`'s `PageFetcher`
//! (trait-object network capability, associated `Error` type) and
//! `original_source/crawler_engine/platforms/base.py`'s use of a Playwright
//! `Page` purely as `goto`/`query_selector`/`evaluate`.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PlatformError;

/// A single matched DOM node, opaque beyond the handful of accessors an
/// adapter needs to pull text and links out of a search-results page.
#[async_trait]
pub trait ElementRef: Send + Sync {
    async fn text_content(&self) -> Result<Option<String>, PlatformError>;
    async fn get_attribute(&self, name: &str) -> Result<Option<String>, PlatformError>;
}

#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), PlatformError>;

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<(), PlatformError>;

    async fn query_selector(&self, selector: &str) -> Result<Option<Box<dyn ElementRef>>, PlatformError>;

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementRef>>, PlatformError>;

    async fn evaluate(&self, script: &str) -> Result<Value, PlatformError>;

    async fn title(&self) -> Result<String, PlatformError>;

    fn url(&self) -> String;

    async fn screenshot(&self) -> Result<Vec<u8>, PlatformError>;
}
