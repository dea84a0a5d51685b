use crate::harvest_browser::{options::chrome_capabilities, page::HarvestPage};
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder};
use harvest_common::{HarvestError, Result};
use std::time::Duration;
use url::Url;

/// Thin wrapper around a `fantoccini` WebDriver client connected to a
/// remote browser service.
///
/// A driver owns one remote session. Call [`HarvestDriver::close`] on every
/// exit path; the remote service bills and limits by open session.
pub struct HarvestDriver {
    client: Client,
}

impl HarvestDriver {
    /// Open a session against the WebDriver service at `endpoint`.
    ///
    /// Any failure to reach the service or to create the session is a
    /// [`HarvestError::Connection`]; it is not retried here.
    pub async fn connect(endpoint: &str, headless: bool) -> Result<Self> {
        let client = ClientBuilder::native()
            .capabilities(chrome_capabilities(headless))
            .connect(endpoint)
            .await
            .map_err(|e| HarvestError::Connection(format!("{endpoint}: {e}")))?;

        Ok(Self { client })
    }

    /// Navigate to `url`, bounded by `page_load_timeout`.
    ///
    /// The deadline is pushed to the remote session and enforced locally, so
    /// a stalled transport cannot outlive it either.
    pub async fn goto(&self, url: &Url, page_load_timeout: Duration) -> Result<HarvestPage> {
        let timeouts = TimeoutConfiguration::new(None, Some(page_load_timeout), None);
        if let Err(e) = self.client.update_timeouts(timeouts).await {
            tracing::warn!(error = %e, "remote session rejected page load timeout");
        }

        match tokio::time::timeout(page_load_timeout, self.client.goto(url.as_str())).await {
            Err(_) => Err(HarvestError::Timeout(page_load_timeout)),
            Ok(Err(e)) if is_timeout(&e) => Err(HarvestError::Timeout(page_load_timeout)),
            Ok(Err(e)) => Err(HarvestError::Driver(anyhow::Error::new(e))),
            Ok(Ok(())) => Ok(HarvestPage::new(self.client.clone())),
        }
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<()> {
        self.client
            .close()
            .await
            .map_err(|e| HarvestError::Driver(anyhow::Error::new(e)))
    }
}

fn is_timeout(err: &CmdError) -> bool {
    matches!(err, CmdError::Standard(wd) if wd.error == ErrorStatus::Timeout)
}
