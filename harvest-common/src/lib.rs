//! Common types and utilities shared across Harvest crates.
//!
//! This crate defines the settings model, the scrape target type,
//! observability helpers, and the shared error type used throughout the
//! Harvest workspace. It stays dependency‑minimal so that every crate can
//! depend on it without pulling in the browser or HTTP stacks.
//!
//! # Overview
//!
//! - [`ScrapeTarget`]: validated absolute URL handed to the browser session
//! - [`BrowserSettings`] / [`ExtractionSettings`]: per‑stage knobs with defaults
//! - [`LlmConfig`]: provider‑agnostic extraction service configuration
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`HarvestError`] and [`Result`]: shared error handling
//!
//! # Examples
//!
//! ```rust
//! use harvest_common::{ExtractionSettings, ScrapeTarget};
//!
//! let target = ScrapeTarget::parse("https://example.com/jobs").unwrap();
//! assert_eq!(target.as_str(), "https://example.com/jobs");
//!
//! let settings = ExtractionSettings::default();
//! assert_eq!(settings.chunk_size, 6000);
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

pub mod observability;

/// Default number of characters per chunk sent to the extraction service.
pub const DEFAULT_CHUNK_SIZE: usize = 6000;

/// Configuration for the extraction service provider.
///
/// See the `harvest-llm` crate for the concrete client implementations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmConfig {
    Gemini {
        api_key: String,
        #[serde(default = "default_gemini_model")]
        model: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
    Openai {
        api_key: String,
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
    None,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::None
    }
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Settings for the remote browser session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowserSettings {
    /// WebDriver endpoint of the remote browser service.
    pub endpoint: String,
    /// Deadline for the initial navigation.
    pub page_load_timeout_secs: u64,
    /// Bound on the anti‑bot challenge wait. Zero skips the wait entirely.
    pub challenge_timeout_secs: u64,
    /// Bound on the wait for a `body` element before reading the source.
    pub readiness_timeout_secs: u64,
    /// Ask the browser to run without a visible window.
    pub headless: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9515".to_string(),
            page_load_timeout_secs: 30,
            challenge_timeout_secs: 10,
            readiness_timeout_secs: 10,
            headless: true,
        }
    }
}

impl BrowserSettings {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn challenge_timeout(&self) -> Duration {
        Duration::from_secs(self.challenge_timeout_secs)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }
}

/// Settings for chunking and the per‑chunk extraction calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// How many chunk requests may be in flight at once.
    pub concurrency: usize,
    /// Upper bound on a single extraction call.
    pub call_timeout_secs: u64,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Extraction service provider.
    pub llm: LlmConfig,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrency: 1,
            call_timeout_secs: 60,
            temperature: None,
            max_tokens: None,
            llm: LlmConfig::default(),
        }
    }
}

impl ExtractionSettings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// A validated absolute `http`/`https` URL to scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ScrapeTarget(Url);

impl ScrapeTarget {
    /// Parse and validate a user supplied URL.
    ///
    /// ```
    /// use harvest_common::{HarvestError, ScrapeTarget};
    ///
    /// assert!(ScrapeTarget::parse("https://example.com").is_ok());
    /// assert!(matches!(
    ///     ScrapeTarget::parse("example.com/no-scheme"),
    ///     Err(HarvestError::InvalidTarget(_))
    /// ));
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let url = Url::parse(raw)
            .map_err(|e| HarvestError::InvalidTarget(format!("{raw}: {e}")))?;

        match url.scheme() {
            "http" | "https" if url.has_host() => Ok(Self(url)),
            "http" | "https" => Err(HarvestError::InvalidTarget(format!("{raw}: missing host"))),
            other => Err(HarvestError::InvalidTarget(format!(
                "{raw}: unsupported scheme '{other}'"
            ))),
        }
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ScrapeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Error types used across the Harvest system.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    /// The remote browser endpoint could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Navigation exceeded the page‑load deadline.
    #[error("Page load timed out after {0:?}")]
    Timeout(Duration),

    /// The browser driver reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// The URL handed to the pipeline is not a usable scrape target.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Configuration was incomplete or invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The extraction service rejected or failed a request.
    #[error("Extraction service error: {0}")]
    Extraction(String),

    /// The run was cancelled between stages.
    #[error("Run cancelled")]
    Cancelled,
}

/// Convenient alias for results that use [`HarvestError`].
pub type Result<T> = std::result::Result<T, HarvestError>;
