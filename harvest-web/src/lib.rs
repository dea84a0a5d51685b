//! Page acquisition and text preparation for a Harvest run.
//!
//! - Browser scraping trait and remote WebDriver implementation (`browser`)
//! - Body extraction and text cleaning (`extract`)
//! - Fixed‑length chunking (`chunk`)
//! - The four‑stage run wiring it all to the extraction service (`pipeline`)

pub mod browser;
pub mod chunk;
pub mod extract;
pub mod pipeline;

pub use browser::{PageScraper, RawMarkup, RemoteBrowserScraper};
pub use chunk::{split, ChunkSequence};
pub use extract::{clean, extract_body, normalize};
pub use pipeline::{Pipeline, PipelineReport, PipelineSettings, ScrapedPage};
