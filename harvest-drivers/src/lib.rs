//! Driver layer for the remote browser session.
//!
//! This crate wraps a `fantoccini` WebDriver client with the few
//! operations a scrape needs, each bounded by an explicit timeout.
//!
//! - [`harvest_browser::driver::HarvestDriver`]: session connect, navigation, release
//! - [`harvest_browser::page::HarvestPage`]: challenge wait, readiness wait, page source
//! - [`harvest_browser::challenge`]: CDP passthrough for the challenge solver
//! - [`harvest_browser::options`]: Chrome capabilities for remote sessions
pub mod harvest_browser;
