//! The four stage run: scrape, normalize, chunk, extract.
//!
//! Stages run strictly in sequence. Cancellation is checked between stages
//! only; a stage that has started always finishes or fails on its own.
use crate::browser::{ChallengeStatus, PageScraper, RawMarkup};
use crate::chunk::{ensure_chunk_size, split};
use crate::extract::normalize;
use harvest_common::observability::TARGET_PIPELINE;
use harvest_common::{BrowserSettings, DEFAULT_CHUNK_SIZE, HarvestError, Result, ScrapeTarget};
use harvest_llm::extractor::{ExtractionOrchestrator, ExtractionResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub browser: BrowserSettings,
    pub chunk_size: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            browser: BrowserSettings::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Normalized text of one page plus what the scrape observed.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapedPage {
    pub target: ScrapeTarget,
    pub text: String,
    pub checksum: String,
    pub challenge: ChallengeStatus,
    pub ready: bool,
    pub markup_chars: usize,
}

impl ScrapedPage {
    fn from_markup(target: &ScrapeTarget, markup: &RawMarkup, text: String) -> Self {
        Self {
            target: target.clone(),
            text,
            checksum: markup.checksum(),
            challenge: markup.challenge.clone(),
            ready: markup.ready,
            markup_chars: markup.html.chars().count(),
        }
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub target: ScrapeTarget,
    pub markup_checksum: String,
    pub challenge: ChallengeStatus,
    pub ready: bool,
    pub text_chars: usize,
    pub chunk_size: usize,
    pub chunk_count: usize,
    pub extraction: ExtractionResult,
}

impl PipelineReport {
    /// The aggregated extraction text.
    pub fn text(&self) -> &str {
        &self.extraction.text
    }
}

/// Wires a [`PageScraper`] and an [`ExtractionOrchestrator`] together.
pub struct Pipeline {
    scraper: Arc<dyn PageScraper>,
    orchestrator: Option<ExtractionOrchestrator>,
    settings: PipelineSettings,
}

impl Pipeline {
    /// Build a pipeline. Fails with `InvalidConfig` on a zero chunk size,
    /// before any remote resource is touched.
    pub fn new(
        scraper: Arc<dyn PageScraper>,
        orchestrator: ExtractionOrchestrator,
        settings: PipelineSettings,
    ) -> Result<Self> {
        ensure_chunk_size(settings.chunk_size)?;
        Ok(Self {
            scraper,
            orchestrator: Some(orchestrator),
            settings,
        })
    }

    /// A pipeline that can only [`scrape_text`](Self::scrape_text); no
    /// extraction service is needed.
    pub fn scrape_only(scraper: Arc<dyn PageScraper>, settings: PipelineSettings) -> Result<Self> {
        ensure_chunk_size(settings.chunk_size)?;
        Ok(Self {
            scraper,
            orchestrator: None,
            settings,
        })
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Scrape `target` and return its normalized text.
    #[instrument(name = "scrape", target = "harvest.pipeline", skip_all, fields(url = %target))]
    pub async fn scrape_text(
        &self,
        target: &ScrapeTarget,
        cancel: &CancellationToken,
    ) -> Result<ScrapedPage> {
        let (markup, text) = self.acquire(target, cancel).await?;
        Ok(ScrapedPage::from_markup(target, &markup, text))
    }

    /// Run all four stages for `target` with `instruction`.
    #[instrument(name = "run", target = "harvest.pipeline", skip_all, fields(url = %target))]
    pub async fn run(
        &self,
        target: &ScrapeTarget,
        instruction: &str,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport> {
        let Some(orchestrator) = &self.orchestrator else {
            return Err(HarvestError::InvalidConfig(
                "no extraction service configured for this pipeline".to_string(),
            ));
        };
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!(target: TARGET_PIPELINE, %run_id, "run started");

        let (markup, text) = self.acquire(target, cancel).await?;

        checkpoint(cancel, "chunk")?;
        let chunks = split(&text, self.settings.chunk_size)?;
        info!(
            target: TARGET_PIPELINE,
            chunks = chunks.len(),
            chunk_size = chunks.max_len(),
            "text chunked"
        );

        checkpoint(cancel, "extract")?;
        let extraction = orchestrator.extract(chunks.as_slice(), instruction).await;

        info!(
            target: TARGET_PIPELINE,
            %run_id,
            total_ms = started.elapsed().as_millis() as u64,
            result_chars = extraction.text.chars().count(),
            "run finished"
        );
        Ok(PipelineReport {
            run_id,
            target: target.clone(),
            markup_checksum: markup.checksum(),
            challenge: markup.challenge.clone(),
            ready: markup.ready,
            text_chars: text.chars().count(),
            chunk_size: chunks.max_len(),
            chunk_count: chunks.len(),
            extraction,
        })
    }

    async fn acquire(
        &self,
        target: &ScrapeTarget,
        cancel: &CancellationToken,
    ) -> Result<(RawMarkup, String)> {
        checkpoint(cancel, "scrape")?;
        let markup = self.scraper.open(target, &self.settings.browser).await?;
        if markup.is_low_confidence() {
            warn!(
                target: TARGET_PIPELINE,
                ready = markup.ready,
                challenge = ?markup.challenge,
                "continuing with best-effort markup"
            );
        }

        checkpoint(cancel, "normalize")?;
        let text = normalize(&markup);
        info!(
            target: TARGET_PIPELINE,
            checksum = %markup.checksum(),
            text_chars = text.chars().count(),
            "page normalized"
        );
        Ok((markup, text))
    }
}

fn checkpoint(cancel: &CancellationToken, next_stage: &str) -> Result<()> {
    if cancel.is_cancelled() {
        warn!(target: TARGET_PIPELINE, stage = next_stage, "run cancelled");
        return Err(HarvestError::Cancelled);
    }
    Ok(())
}
