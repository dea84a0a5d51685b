#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use harvest_common::observability::{LogConfig, LogFormat};
use harvest_common::{HarvestError, Result};
use harvest_llm::traits::{LlmClient, LlmResponse};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let log_dir = std::env::temp_dir().join("harvest-tests");
        let config = LogConfig {
            app_name: "harvest-tests",
            log_dir: Some(log_dir),
            emit_stderr: true,
            format: if std::env::var("HARVEST_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".to_string(),
        };

        harvest_common::observability::init_logging(config).unwrap_or_default()
    });
}

/// Scripted reply for one call to [`ScriptedClient`].
#[derive(Clone)]
pub enum Reply {
    Text(&'static str),
    Error(&'static str),
    Delayed(Duration, &'static str),
}

/// Test double that answers based on which chunk marker appears in the prompt.
pub struct ScriptedClient {
    replies: Vec<(&'static str, Reply)>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<(&'static str, Reply)>) -> Self {
        Self {
            replies,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn generate(
        &self,
        prompt: &str,
        _system_prompt: Option<&str>,
        _max_tokens: Option<u32>,
        _temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        let reply = self
            .replies
            .iter()
            .find(|(marker, _)| prompt.contains(marker))
            .map(|(_, reply)| reply.clone())
            .unwrap_or(Reply::Text(""));

        let text = match reply {
            Reply::Text(text) => text,
            Reply::Error(msg) => return Err(HarvestError::Extraction(msg.to_string())),
            Reply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                text
            }
        };

        Ok(LlmResponse {
            text: text.to_string(),
            model: Some("scripted".into()),
            tokens_used: None,
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
