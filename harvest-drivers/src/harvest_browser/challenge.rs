//! Anti‑bot challenge handling through the remote browser's CDP passthrough.
//!
//! Scraping‑browser services expose a `Captcha.waitForSolve` CDP command
//! that blocks until a detected challenge is solved or the detect timeout
//! expires. Chromedriver‑compatible endpoints forward CDP commands posted
//! to `session/{id}/goog/cdp/execute`.
use fantoccini::wd::WebDriverCompatibleCommand;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const WAIT_FOR_SOLVE: &str = "Captcha.waitForSolve";

/// What the challenge wait observed. Never fatal for a scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChallengeStatus {
    /// The wait was disabled by configuration.
    Skipped,
    /// The remote service answered with a status such as `not_detected`
    /// or `solve_finished`.
    Resolved { status: String },
    /// No usable answer arrived within the bound.
    Unresolved { reason: String },
}

impl ChallengeStatus {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, ChallengeStatus::Unresolved { .. })
    }

    /// Interpret the value returned by [`WAIT_FOR_SOLVE`].
    ///
    /// ```
    /// use harvest_drivers::harvest_browser::challenge::ChallengeStatus;
    /// use serde_json::json;
    ///
    /// assert_eq!(
    ///     ChallengeStatus::from_response(&json!({ "status": "not_detected" })),
    ///     ChallengeStatus::Resolved { status: "not_detected".into() }
    /// );
    /// ```
    pub fn from_response(value: &Value) -> Self {
        let body = value.get("value").unwrap_or(value);
        match body.get("status").and_then(Value::as_str) {
            Some(status) if status.contains("fail") => ChallengeStatus::Unresolved {
                reason: status.to_string(),
            },
            Some(status) => ChallengeStatus::Resolved {
                status: status.to_string(),
            },
            None => ChallengeStatus::Unresolved {
                reason: "no status in challenge response".to_string(),
            },
        }
    }
}

/// A raw CDP command sent through the WebDriver session.
#[derive(Debug)]
pub struct CdpCommand {
    cmd: &'static str,
    params: Value,
}

impl CdpCommand {
    pub fn new(cmd: &'static str, params: Value) -> Self {
        Self { cmd, params }
    }

    /// `Captcha.waitForSolve` with the given detection timeout.
    pub fn wait_for_solve(detect_timeout: Duration) -> Self {
        Self::new(
            WAIT_FOR_SOLVE,
            json!({ "detectTimeout": detect_timeout.as_millis() as u64 }),
        )
    }
}

impl WebDriverCompatibleCommand for CdpCommand {
    fn endpoint(
        &self,
        base_url: &url::Url,
        session_id: Option<&str>,
    ) -> Result<url::Url, url::ParseError> {
        base_url.join(&format!(
            "session/{}/goog/cdp/execute",
            session_id.unwrap_or_default()
        ))
    }

    fn method_and_body(&self, _request_url: &url::Url) -> (http::Method, Option<String>) {
        let body = json!({ "cmd": self.cmd, "params": self.params });
        (http::Method::POST, Some(body.to_string()))
    }
}
