use async_trait::async_trait;
use harvest_common::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Raw text payload. An empty string is a valid "nothing matched" answer.
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response to the given prompt with optional system prompt
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse>;

    /// Check if the extraction service is reachable and answering
    async fn health_check(&self) -> Result<bool> {
        match self.generate("Respond with just 'OK'", None, Some(5), Some(0.1)).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(model = self.model_name(), "health check failed: {e}");
                Ok(false)
            }
        }
    }

    /// Get the model name being used
    fn model_name(&self) -> &str;
}
