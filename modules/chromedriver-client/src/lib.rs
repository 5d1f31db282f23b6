pub mod error;
pub mod types;

pub use error::{ChromedriverError, Result};
pub use types::{Cookie, LogEntry, ResponseBody};

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

pub struct ChromedriverClient {
    client: reqwest::Client,
    base_url: String,
}

impl ChromedriverClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Open a new browser session with the given W3C capabilities
    /// (sent as `capabilities.alwaysMatch`).
    pub async fn start_session(&self, capabilities: Value) -> Result<DriverSession> {
        let body = json!({ "capabilities": { "alwaysMatch": capabilities } });

        let resp = self
            .client
            .post(format!("{}/session", self.base_url))
            .json(&body)
            .send()
            .await?;

        let value: Value = unwrap_value(resp).await?;
        let id = value
            .pointer("/sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ChromedriverError::Protocol("session response missing sessionId".to_string())
            })?
            .to_string();

        debug!(session = %id, "chromedriver session started");
        Ok(DriverSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            id,
        })
    }
}

/// One live browser session. Dropping the handle does not close the
/// browser; call [`DriverSession::quit`] when done with it.
pub struct DriverSession {
    client: reqwest::Client,
    base_url: String,
    id: String,
}

impl DriverSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!("{}/session/{}/{}", self.base_url, self.id, suffix)
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.endpoint("url"))
            .json(&json!({ "url": url }))
            .send()
            .await?;
        unwrap_value::<Value>(resp).await?;
        Ok(())
    }

    pub async fn add_cookie(&self, cookie: &Cookie) -> Result<()> {
        let resp = self
            .client
            .post(self.endpoint("cookie"))
            .json(&json!({ "cookie": cookie }))
            .send()
            .await?;
        unwrap_value::<Value>(resp).await?;
        Ok(())
    }

    /// Execute synchronous JavaScript in the page; returns the script's
    /// return value.
    pub async fn execute_script(&self, script: &str) -> Result<Value> {
        let resp = self
            .client
            .post(self.endpoint("execute/sync"))
            .json(&json!({ "script": script, "args": [] }))
            .send()
            .await?;
        unwrap_value(resp).await
    }

    /// Drain one log buffer. Entries are consumed: a second call returns
    /// only entries captured since the first.
    pub async fn get_log(&self, log_type: &str) -> Result<Vec<LogEntry>> {
        let resp = self
            .client
            .post(self.endpoint("se/log"))
            .json(&json!({ "type": log_type }))
            .send()
            .await?;
        unwrap_value(resp).await
    }

    /// Run one DevTools command through ChromeDriver's CDP bridge.
    pub async fn execute_cdp(&self, cmd: &str, params: Value) -> Result<Value> {
        let resp = self
            .client
            .post(self.endpoint("goog/cdp/execute"))
            .json(&json!({ "cmd": cmd, "params": params }))
            .send()
            .await?;
        unwrap_value(resp).await
    }

    /// Fetch the captured body of one network response by request id.
    pub async fn response_body(&self, request_id: &str) -> Result<ResponseBody> {
        let value = self
            .execute_cdp("Network.getResponseBody", json!({ "requestId": request_id }))
            .await?;
        serde_json::from_value(value).map_err(|e| {
            ChromedriverError::Protocol(format!("malformed getResponseBody result: {e}"))
        })
    }

    /// Close the browser session. The handle is unusable afterwards; any
    /// further call will get an invalid-session error from the server.
    pub async fn quit(&self) -> Result<()> {
        let resp = self
            .client
            .delete(format!("{}/session/{}", self.base_url, self.id))
            .send()
            .await?;
        unwrap_value::<Value>(resp).await?;
        debug!(session = %self.id, "chromedriver session closed");
        Ok(())
    }
}

#[derive(Deserialize)]
struct Wire<T> {
    value: T,
}

async fn unwrap_value<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ChromedriverError::api(status.as_u16(), body));
    }
    let wire: Wire<T> = resp.json().await?;
    Ok(wire.value)
}
