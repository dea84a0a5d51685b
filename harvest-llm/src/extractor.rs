//! Chunk‑wise extraction with partial‑failure aggregation.
//!
//! Every chunk becomes one request to the extraction service. A failing
//! chunk is recorded and skipped; it never aborts the run. Payloads are
//! aggregated in chunk order no matter how many requests were in flight.
//!
//! Matches that straddle a chunk boundary can be missed: each request only
//! sees its own chunk.
use crate::traits::LlmClient;
use futures::stream::{self, StreamExt};
use harvest_common::observability::TARGET_EXTRACT;
use harvest_common::ExtractionSettings;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Separator placed between non‑empty chunk payloads in the aggregate.
pub const AGGREGATE_SEPARATOR: &str = "\n\n";

/// Build the request sent for one chunk.
///
/// ```
/// use harvest_llm::extractor::build_prompt;
///
/// let prompt = build_prompt("Contact: jane@example.com", "extract emails");
/// let content = prompt.find("jane@example.com").unwrap();
/// let requirements = prompt.find("extract emails").unwrap();
/// assert!(content < requirements);
/// ```
pub fn build_prompt(content: &str, instruction: &str) -> String {
    format!(
        r#"You are a data extraction assistant. Extract specific information from the web content below with precision.

**Content to analyze:**
{content}

**Extraction requirements:**
{instruction}

**Instructions:**
1. Extract ONLY information that directly matches the requirements above.
2. Return the data in a clean, structured format (JSON, list, or plain text as appropriate).
3. If several items match, present them in an organized manner.
4. If nothing matches, return an empty response.
5. Do not include explanations, comments, or any additional text.
6. Keep matched values exactly as they appear in the content.

**Extracted data:**
"#
    )
}

/// Tuning knobs for an extraction run.
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    /// Requests allowed in flight at once. `1` processes chunks strictly in sequence.
    pub concurrency: usize,
    /// Upper bound on a single service call.
    pub call_timeout: Duration,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            call_timeout: Duration::from_secs(60),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl From<&ExtractionSettings> for ExtractionOptions {
    fn from(settings: &ExtractionSettings) -> Self {
        Self {
            concurrency: settings.concurrency.max(1),
            call_timeout: settings.call_timeout(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

/// Result of one chunk's extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// The service returned a non‑empty payload.
    Extracted(String),
    /// The service answered with nothing: no match in this chunk.
    NoMatch,
    /// Transport error, service error, or call timeout.
    Failed(String),
}

/// Counters for one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub no_match: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

/// Aggregated answer plus statistics. An empty `text` with
/// `stats.attempted > 0` means the run completed but nothing matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub text: String,
    pub stats: ExtractionStats,
}

impl ExtractionResult {
    /// Fold ordered per‑chunk outcomes into the aggregate.
    ///
    /// ```
    /// use harvest_llm::extractor::{ChunkOutcome, ExtractionResult};
    /// use std::time::Duration;
    ///
    /// let result = ExtractionResult::from_outcomes(
    ///     vec![
    ///         ChunkOutcome::Extracted("a@x.io".into()),
    ///         ChunkOutcome::Failed("connection reset".into()),
    ///         ChunkOutcome::NoMatch,
    ///         ChunkOutcome::Extracted("b@y.io".into()),
    ///     ],
    ///     Duration::from_millis(5),
    /// );
    /// assert_eq!(result.text, "a@x.io\n\nb@y.io");
    /// assert_eq!((result.stats.attempted, result.stats.succeeded), (4, 2));
    /// assert_eq!((result.stats.failed, result.stats.no_match), (1, 1));
    /// ```
    pub fn from_outcomes(outcomes: Vec<ChunkOutcome>, elapsed: Duration) -> Self {
        let mut stats = ExtractionStats {
            attempted: outcomes.len(),
            elapsed,
            ..ExtractionStats::default()
        };
        let mut payloads = Vec::new();

        for outcome in outcomes {
            match outcome {
                ChunkOutcome::Extracted(text) => {
                    stats.succeeded += 1;
                    payloads.push(text);
                }
                ChunkOutcome::NoMatch => stats.no_match += 1,
                ChunkOutcome::Failed(_) => stats.failed += 1,
            }
        }

        Self {
            text: payloads.join(AGGREGATE_SEPARATOR),
            stats,
        }
    }
}

/// Drives chunks through an injected [`LlmClient`].
pub struct ExtractionOrchestrator {
    client: Arc<dyn LlmClient + Send + Sync>,
    options: ExtractionOptions,
}

impl ExtractionOrchestrator {
    pub fn new(client: Arc<dyn LlmClient + Send + Sync>) -> Self {
        Self {
            client,
            options: ExtractionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExtractionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    /// Run every chunk through the service and aggregate the answers.
    ///
    /// Empty `chunks` or a blank `instruction` return an empty result with
    /// zero counts without contacting the service.
    pub async fn extract(&self, chunks: &[String], instruction: &str) -> ExtractionResult {
        if chunks.is_empty() {
            warn!(target: TARGET_EXTRACT, "no chunks provided for extraction");
            return ExtractionResult::default();
        }
        if instruction.trim().is_empty() {
            warn!(target: TARGET_EXTRACT, "no extraction instruction provided");
            return ExtractionResult::default();
        }

        let started = Instant::now();
        let total = chunks.len();
        let concurrency = self.options.concurrency.max(1);
        info!(
            target: TARGET_EXTRACT,
            chunks = total,
            concurrency,
            model = self.client.model_name(),
            %instruction,
            "starting extraction"
        );

        // `buffered` yields in input order regardless of completion order.
        let outcomes: Vec<ChunkOutcome> = stream::iter(chunks.iter().enumerate())
            .map(|(idx, chunk)| self.extract_chunk(idx + 1, total, chunk, instruction))
            .buffered(concurrency)
            .collect()
            .await;

        let result = ExtractionResult::from_outcomes(outcomes, started.elapsed());
        let stats = &result.stats;
        info!(
            target: TARGET_EXTRACT,
            attempted = stats.attempted,
            succeeded = stats.succeeded,
            failed = stats.failed,
            no_match = stats.no_match,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            result_chars = result.text.chars().count(),
            "extraction finished"
        );
        if stats.failed > 0 {
            warn!(target: TARGET_EXTRACT, failed = stats.failed, "some chunks failed");
        }

        result
    }

    async fn extract_chunk(
        &self,
        number: usize,
        total: usize,
        chunk: &str,
        instruction: &str,
    ) -> ChunkOutcome {
        let started = Instant::now();
        info!(
            target: TARGET_EXTRACT,
            chunk = number,
            total,
            chars = chunk.chars().count(),
            "processing chunk"
        );

        let prompt = build_prompt(chunk, instruction);
        let call = self.client.generate(
            &prompt,
            None,
            self.options.max_tokens,
            self.options.temperature,
        );

        match tokio::time::timeout(self.options.call_timeout, call).await {
            Err(_) => {
                error!(
                    target: TARGET_EXTRACT,
                    chunk = number,
                    timeout_ms = self.options.call_timeout.as_millis() as u64,
                    "extraction call timed out"
                );
                ChunkOutcome::Failed(format!(
                    "timed out after {:?}",
                    self.options.call_timeout
                ))
            }
            Ok(Err(e)) => {
                error!(target: TARGET_EXTRACT, chunk = number, error = %e, "extraction call failed");
                ChunkOutcome::Failed(e.to_string())
            }
            Ok(Ok(response)) => {
                let text = response.text.trim();
                if text.is_empty() {
                    warn!(target: TARGET_EXTRACT, chunk = number, "no match in this chunk");
                    ChunkOutcome::NoMatch
                } else {
                    info!(
                        target: TARGET_EXTRACT,
                        chunk = number,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "chunk extracted"
                    );
                    ChunkOutcome::Extracted(text.to_string())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_keeps_block_order_and_single_content_slot() {
        let prompt = build_prompt("CHUNK-BODY", "list prices");
        let content = prompt.find("**Content to analyze:**").unwrap();
        let requirements = prompt.find("**Extraction requirements:**").unwrap();
        let instructions = prompt.find("**Instructions:**").unwrap();
        assert!(content < requirements && requirements < instructions);
        assert_eq!(prompt.matches("CHUNK-BODY").count(), 1);
        assert!(!prompt.contains("{content}"));
    }

    #[test]
    fn all_failures_fold_into_empty_text() {
        let result = ExtractionResult::from_outcomes(
            vec![
                ChunkOutcome::Failed("boom".into()),
                ChunkOutcome::Failed("boom".into()),
            ],
            Duration::ZERO,
        );
        assert!(result.text.is_empty());
        assert_eq!(result.stats.attempted, 2);
        assert_eq!(result.stats.failed, 2);
        assert_eq!(result.stats.succeeded, 0);
    }

    #[test]
    fn options_from_settings_never_drop_below_one_worker() {
        let settings = ExtractionSettings {
            concurrency: 0,
            call_timeout_secs: 5,
            ..ExtractionSettings::default()
        };
        let options = ExtractionOptions::from(&settings);
        assert_eq!(options.concurrency, 1);
        assert_eq!(options.call_timeout, Duration::from_secs(5));
    }

    #[test]
    fn stats_serialize_elapsed_as_millis() {
        let stats = ExtractionStats {
            attempted: 1,
            elapsed: Duration::from_millis(1500),
            ..ExtractionStats::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["elapsed_ms"], 1500);
    }
}
