//! Blocking HTTP transport backed by reqwest.

use std::time::Duration;

use tracing::debug;

use super::provider::{DataError, HttpTransport};

/// Browser-like user agent; several public endpoints reject the default one.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| DataError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get_text(&self, url: &str) -> Result<String, DataError> {
        debug!(url, "GET");
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DataError::Transport(format!("{url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::Transport(format!("HTTP {status} for {url}")));
        }

        resp.text()
            .map_err(|e| DataError::Transport(format!("reading body of {url}: {e}")))
    }
}
