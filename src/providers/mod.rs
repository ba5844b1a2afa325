//! LLM server clients

pub mod ollama;

// Re-export for convenience
pub use ollama::OllamaClient;

use crate::error::Error;
use crate::request::RequestOptions;

/// Contract shared by LLM server clients
#[allow(async_fn_in_trait)]
pub trait LlmClient
{   /// Base URL of the server
    fn api_url(&self) -> &str;

    /// API key, empty when unset
    fn api_key(&self) -> &str;

    /// Model used by `generate`
    fn model_name(&self) -> &str;

    /// Generate text for `prompt`, overlaying `options` on the request
    async fn generate(
      &self
    , prompt: &str
    , options: &RequestOptions
    ) -> Result<String, Error>;
}
