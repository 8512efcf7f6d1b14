//! Host bridge over the host's local control endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::START_BACKEND;
use super::bridge::HostBridge;
use super::error::HostError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The host waits for the backend's port file before answering.
const START_TIMEOUT: Duration = Duration::from_secs(60);

/// Talks to a host that exposes `POST {base}/invoke/{command}`.
///
/// Every call carries a timeout; the locator holds its cache lock across
/// `get_backend_port`, so a hung host must not hang the client with it.
pub struct HttpBridge {
    client: Client,
    base_url: Url,
    request_timeout: Duration,
    start_timeout: Duration,
}

impl HttpBridge {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
            request_timeout: REQUEST_TIMEOUT,
            start_timeout: START_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, request: Duration, start: Duration) -> Self {
        self.request_timeout = request;
        self.start_timeout = start;
        self
    }

    fn timeout_for(&self, command: &str) -> Duration {
        if command == START_BACKEND {
            self.start_timeout
        } else {
            self.request_timeout
        }
    }

    /// Build from the raw marker value; `None` when it is not a URL.
    pub fn from_marker(raw: &str) -> Option<Self> {
        Url::parse(raw.trim()).ok().map(Self::new)
    }

    fn command_url(&self, command: &str) -> Result<Url, HostError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HostError::Unavailable)?
            .pop_if_empty()
            .extend(["invoke", command]);
        Ok(url)
    }
}

#[async_trait]
impl HostBridge for HttpBridge {
    async fn invoke(&self, command: &str, args: Option<Value>) -> Result<Value, HostError> {
        let url = self.command_url(command)?;
        debug!(command, url = %url, "invoking host command");

        let body = args.unwrap_or_else(|| Value::Object(Default::default()));
        let request = self
            .client
            .post(url)
            .timeout(self.timeout_for(command))
            .json(&body);
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) if e.is_connect() || e.is_timeout() => {
                debug!(command, error = %e, "host control endpoint unreachable");
                return Err(HostError::Unavailable);
            }
            Err(e) => return Err(HostError::Command(e.to_string())),
        };

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| HostError::Command(e.to_string()))?;

        if !status.is_success() {
            return Err(HostError::Command(error_detail(&text, status.as_u16())));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| HostError::Command(format!("invalid reply: {e}")))
    }
}

/// The host reports failures as `{"error": "..."}`; fall back to the body.
fn error_detail(body: &str, status: u16) -> String {
    let from_json = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string));

    match from_json {
        Some(detail) => detail,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => format!("host returned {status}"),
    }
}
