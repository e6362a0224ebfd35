//! The trait adapters and the pipeline's enrichment stage call through to
//! reach a billable model. Grounded on `openai_client::OpenAIClient` and
//! `original_source/crawler_engine/ai/vision_service.py`/`prompt_manager.py`:
//! a request/response split that carries input and output token counts
//! separately, since [`crate::PricingTable::estimate`] prefers the split
//! when it is available.

use async_trait::async_trait;
use thiserror::Error;

use crawler_domain::{NetworkError, ParseError, RateLimitError};

/// Text plus per-direction token accounting for one model call.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub text: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
}

#[derive(Debug, Error, Clone)]
pub enum ModelError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// The model name this client calls, used to look up pricing.
    fn model_name(&self) -> &str;

    async fn vision_analyze(&self, prompt: &str, image_url: &str) -> Result<ModelResponse, ModelError>;

    async fn text_analyze(&self, prompt: &str) -> Result<ModelResponse, ModelError>;
}
