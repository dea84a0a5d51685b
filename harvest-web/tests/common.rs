#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};

use async_trait::async_trait;
use harvest_common::{BrowserSettings, HarvestError, Result, ScrapeTarget};
use harvest_llm::traits::{LlmClient, LlmResponse};
use harvest_web::browser::{ChallengeStatus, PageScraper, RawMarkup};

static INIT: Once = Once::new();

pub fn init_test_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "harvest=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// What [`FakeScraper`] hands back from `open`.
pub enum Page {
    Markup(&'static str),
    Challenged(&'static str),
    Refused,
}

/// Scraper double that never touches the network.
pub struct FakeScraper {
    page: Page,
    opened: AtomicUsize,
}

impl FakeScraper {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            opened: AtomicUsize::new(0),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageScraper for FakeScraper {
    async fn open(&self, _target: &ScrapeTarget, settings: &BrowserSettings) -> Result<RawMarkup> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        match self.page {
            Page::Markup(html) => Ok(RawMarkup::new(html)),
            Page::Challenged(html) => Ok(RawMarkup {
                html: html.to_string(),
                challenge: ChallengeStatus::Unresolved {
                    reason: "solve_failed".into(),
                },
                ready: false,
            }),
            Page::Refused => Err(HarvestError::Connection(format!(
                "{}: connection refused",
                settings.endpoint
            ))),
        }
    }
}

/// LLM double that echoes a fixed answer for prompts containing a marker
/// and fails for prompts containing `FAIL`.
pub struct EchoClient {
    marker: &'static str,
    answer: &'static str,
    prompts: Mutex<Vec<String>>,
}

impl EchoClient {
    pub fn new(marker: &'static str, answer: &'static str) -> Self {
        Self {
            marker,
            answer,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for EchoClient {
    async fn generate(
        &self,
        prompt: &str,
        _system_prompt: Option<&str>,
        _max_tokens: Option<u32>,
        _temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.contains("FAIL") {
            return Err(HarvestError::Extraction("upstream reset".into()));
        }
        let text = if prompt.contains(self.marker) { self.answer } else { "" };
        Ok(LlmResponse {
            text: text.to_string(),
            model: Some("echo".into()),
            tokens_used: None,
        })
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}
