use crate::harvest_browser::challenge::{CdpCommand, ChallengeStatus};
use fantoccini::{Client, Locator};
use harvest_common::observability::TARGET_SCRAPE;
use harvest_common::{HarvestError, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Handle to the page loaded by [`super::driver::HarvestDriver::goto`].
///
/// The page borrows the driver's session; it does not own it and never
/// closes it.
pub struct HarvestPage {
    client: Client,
}

impl HarvestPage {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Give the remote challenge solver up to `timeout` to finish.
    ///
    /// Best effort: errors and timeouts come back as
    /// [`ChallengeStatus::Unresolved`], never as `Err`.
    pub async fn await_challenge(&self, timeout: Duration) -> ChallengeStatus {
        if timeout.is_zero() {
            return ChallengeStatus::Skipped;
        }

        let cmd = CdpCommand::wait_for_solve(timeout);
        // Allow the remote side to report back just after its own detect timeout.
        let bound = timeout + Duration::from_secs(2);

        let status = match tokio::time::timeout(bound, self.client.issue_cmd(cmd)).await {
            Err(_) => ChallengeStatus::Unresolved {
                reason: format!("no answer within {bound:?}"),
            },
            Ok(Err(e)) => ChallengeStatus::Unresolved {
                reason: e.to_string(),
            },
            Ok(Ok(value)) => ChallengeStatus::from_response(&value),
        };

        match &status {
            ChallengeStatus::Resolved { status } => {
                info!(target: TARGET_SCRAPE, %status, "challenge solve status")
            }
            ChallengeStatus::Unresolved { reason } => {
                warn!(target: TARGET_SCRAPE, %reason, "challenge handling failed; continuing")
            }
            ChallengeStatus::Skipped => {}
        }
        status
    }

    /// Wait up to `timeout` for a `body` element. Returns whether it appeared.
    pub async fn await_ready(&self, timeout: Duration) -> bool {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css("body"))
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    target: TARGET_SCRAPE,
                    error = %e,
                    "page readiness not observed; reading markup anyway"
                );
                false
            }
        }
    }

    /// Return the full page HTML source.
    pub async fn get_content(&self) -> Result<String> {
        self.client
            .source()
            .await
            .map_err(|e| HarvestError::Driver(anyhow::Error::new(e)))
    }
}
