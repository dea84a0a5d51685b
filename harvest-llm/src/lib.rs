//! Extraction service integration for Harvest.
//!
//! This crate exposes a common [`traits::LlmClient`] interface, concrete
//! Gemini and OpenAI clients, and the [`extractor::ExtractionOrchestrator`]
//! that drives a chunk sequence through a client and aggregates the
//! per‑chunk answers.
//!
//! # Examples
//! ```no_run
//! use harvest_common::{LlmConfig, Result};
//! use harvest_llm::ensure_llm_ready;
//! use harvest_llm::traits::LlmClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let cfg = LlmConfig::Gemini {
//!     api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
//!     model: "gemini-1.5-flash".into(),
//!     base_url: None,
//! };
//! let client = ensure_llm_ready(&cfg)?;
//! assert_eq!(client.model_name(), "gemini-1.5-flash");
//! # Ok(())
//! # }
//! ```
pub mod extractor;
#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "openai")]
pub mod openai;
pub mod traits;

use harvest_common::{HarvestError, LlmConfig};
use std::sync::Arc;
use traits::LlmClient;

/// Build the client described by `config`.
pub fn ensure_llm_ready(
    config: &LlmConfig,
) -> harvest_common::Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    match config {
        #[cfg(feature = "gemini")]
        LlmConfig::Gemini {
            api_key,
            model,
            base_url,
        } => {
            let mut client = gemini::GeminiClient::new(api_key.clone(), model.clone())?;
            if let Some(base) = base_url {
                client = client.with_base_url(base.clone());
            }
            Ok(Arc::new(client))
        }
        #[cfg(feature = "openai")]
        LlmConfig::Openai {
            api_key,
            model,
            base_url,
        } => {
            let mut client = openai::OpenAiClient::new(api_key.clone(), model.clone())?;
            if let Some(base) = base_url {
                client = client.with_base_url(base.clone());
            }
            Ok(Arc::new(client))
        }
        LlmConfig::None => Err(HarvestError::InvalidConfig(
            "No extraction service configured".to_string(),
        )),
        #[allow(unreachable_patterns)]
        _ => Err(HarvestError::InvalidConfig(
            "Extraction provider not enabled".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_provider_is_a_config_error() {
        assert!(matches!(
            ensure_llm_ready(&LlmConfig::None),
            Err(HarvestError::InvalidConfig(_))
        ));
    }

    #[cfg(feature = "gemini")]
    #[test]
    fn builds_gemini_client_with_model_name() {
        let client = ensure_llm_ready(&LlmConfig::Gemini {
            api_key: "k".into(),
            model: "gemini-1.5-pro".into(),
            base_url: Some("http://127.0.0.1:1/v1beta".into()),
        })
        .unwrap();
        assert_eq!(client.model_name(), "gemini-1.5-pro");
    }
}
