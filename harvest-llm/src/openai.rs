use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use harvest_common::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ResponsesApiRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ResponsesApiResponse {
    model: String,
    #[serde(default)]
    output: Vec<ResponseMessage>,
    usage: Option<ResponseUsage>,
}

/// One element in the `output` array
#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Vec<ResponseContent>,
}

/// One part of the message `content`
#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    total_tokens: Option<u32>,
}

impl OpenAiClient {
    /// Create a new client for the given API key and model.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(HarvestError::InvalidConfig(
                "OpenAI API key is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| HarvestError::InvalidConfig(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            client,
            base_url: OPENAI_API_BASE.to_string(),
            api_key,
            model,
        })
    }

    /// Use an OpenAI‑compatible gateway instead of the public API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let req = ResponsesApiRequest {
            model: &self.model,
            input: prompt,
            instructions: system_prompt,
            max_output_tokens: max_tokens,
            temperature,
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "sending OpenAI request");

        let resp = self
            .client
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| HarvestError::Extraction(format!("OpenAI request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(HarvestError::Extraction(format!(
                "OpenAI API error ({status}): {body}"
            )));
        }

        let resp: ResponsesApiResponse = resp
            .json()
            .await
            .map_err(|e| HarvestError::Extraction(format!("Failed to parse OpenAI response: {e}")))?;

        let text = resp
            .output
            .iter()
            .flat_map(|msg| &msg.content)
            .find(|c| c.kind == "output_text")
            .map(|c| c.text.clone())
            .unwrap_or_default();

        Ok(LlmResponse {
            text,
            model: Some(resp.model),
            tokens_used: resp.usage.and_then(|u| u.total_tokens),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
