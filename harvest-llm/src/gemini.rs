use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use harvest_common::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    total_token_count: Option<u32>,
}

/// Google Gemini `generateContent` client.
///
/// The API key travels in the `x-goog-api-key` header so it never shows up
/// in request URLs or logs.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a new client using the provided API key and model.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(HarvestError::InvalidConfig(
                "Gemini API key is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                HarvestError::InvalidConfig(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
            model,
        })
    }

    /// Point the client at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let generation_config = if max_tokens.is_some() || temperature.is_some() {
            Some(GeminiGenerationConfig {
                temperature,
                max_output_tokens: max_tokens,
            })
        } else {
            None
        };

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config,
            system_instruction: system_prompt.map(|sys| GeminiContent {
                parts: vec![GeminiPart {
                    text: sys.to_string(),
                }],
            }),
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "sending Gemini request");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| HarvestError::Extraction(format!("Gemini request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();

            return Err(HarvestError::Extraction(match status.as_u16() {
                429 => "Rate limit exceeded".to_string(),
                401 => "Invalid API key".to_string(),
                403 => "API access forbidden".to_string(),
                _ => format!("Gemini API error ({}): {}", status, error_text),
            }));
        }

        let gemini_response: GeminiResponse = resp.json().await.map_err(|e| {
            HarvestError::Extraction(format!("Failed to parse Gemini response: {}", e))
        })?;

        if let Some(reason) = gemini_response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(HarvestError::Extraction(format!(
                "Prompt blocked by Gemini: {reason}"
            )));
        }

        let text = match gemini_response.candidates.first() {
            Some(candidate) => {
                if candidate.finish_reason.as_deref() == Some("SAFETY") {
                    return Err(HarvestError::Extraction(
                        "Content blocked by Gemini safety filters".to_string(),
                    ));
                }
                candidate
                    .content
                    .as_ref()
                    .map(|c| {
                        c.parts
                            .iter()
                            .filter_map(|p| p.text.as_deref())
                            .collect::<String>()
                    })
                    .unwrap_or_default()
            }
            None => {
                tracing::debug!(model = %self.model, "Gemini returned no candidates");
                String::new()
            }
        };

        Ok(LlmResponse {
            text,
            model: Some(self.model.clone()),
            tokens_used: gemini_response
                .usage_metadata
                .and_then(|u| u.total_token_count),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
