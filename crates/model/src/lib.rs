mod fallback;
mod gemini;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use voyage_core::VoyageConfig;

pub use fallback::UnconfiguredModel;
pub use gemini::GeminiClient;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("generative model is not configured: {0}")]
    NotConfigured(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("model API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned no text")]
    EmptyCompletion,
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
}

/// Single-shot text completion: one prompt in, one reply out. No
/// conversation state, no streaming.
#[async_trait]
pub trait PlanModel: Send + Sync {
    fn model_name(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Picks the live client when an API key is present; otherwise every call
/// fails with [`ModelError::NotConfigured`].
pub fn load_model(config: &VoyageConfig) -> Result<Arc<dyn PlanModel>, ModelError> {
    match config.gemini_api_key.as_deref() {
        Some(api_key) => Ok(Arc::new(GeminiClient::new(
            api_key,
            config.gemini_model.as_str(),
            config.gemini_base_url.as_str(),
            config.model_timeout,
        )?)),
        None => Ok(Arc::new(UnconfiguredModel::new("VOYAGE_GEMINI_API_KEY is not set"))),
    }
}
