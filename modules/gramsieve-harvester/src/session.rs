//! Boundary between worker threads and the browser backend.
//!
//! Workers are plain OS threads; the ChromeDriver client is async. The
//! [`ChromeSession`] facade bridges the two by blocking on a shared tokio
//! runtime handle, so each worker drives its own exclusive browser session
//! with ordinary blocking calls.

use anyhow::Context;
use chromedriver_client::{ChromedriverClient, Cookie, DriverSession};
use serde_json::{json, Value};
use tokio::runtime::Handle;
use tracing::warn;

const COOKIE_NAME: &str = "sessionid";
const COOKIE_DOMAIN: &str = ".instagram.com";
const COOKIE_PRIME_URL: &str = "https://www.instagram.com/";

const LOAD_MORE_SCRIPT: &str = "window.scrollTo(0, document.documentElement.scrollHeight);";

/// One captured network response surfaced by the browser backend. Ephemeral:
/// lives only within one scroll iteration, discarded after classification.
#[derive(Debug, Clone)]
pub struct RawNetworkEvent {
    pub method: String,
    pub request_id: String,
    pub url: String,
}

/// One exclusive browser session, owned by a single worker for its entire
/// lifetime.
pub trait BrowserSession {
    /// Navigate to the target resource, clearing previously captured
    /// network history first.
    fn open(&mut self, url: &str) -> anyhow::Result<()>;

    /// Install the authenticated session cookie.
    fn inject_session_cookie(&mut self, value: &str) -> anyhow::Result<()>;

    /// Trigger one "load more" action on the current page.
    fn trigger_load_more(&mut self) -> anyhow::Result<()>;

    /// Drain response events captured since the last call.
    fn read_captured_events(&mut self) -> anyhow::Result<Vec<RawNetworkEvent>>;

    /// Fetch the full body of one captured response.
    fn fetch_event_body(&mut self, request_id: &str) -> anyhow::Result<String>;

    /// Release the underlying browser. Best effort; the default does
    /// nothing.
    fn close(&mut self) {}
}

/// Creates sessions for workers. Shared across the pool; each call yields an
/// independent browser session.
pub trait SessionFactory: Send + Sync {
    fn create(&self) -> anyhow::Result<Box<dyn BrowserSession>>;
}

// ---------------------------------------------------------------------------
// ChromeDriver-backed implementation
// ---------------------------------------------------------------------------

pub struct ChromeSessionFactory {
    handle: Handle,
    webdriver_url: String,
    session_cookie: Option<String>,
}

impl ChromeSessionFactory {
    pub fn new(handle: Handle, webdriver_url: &str, session_cookie: Option<String>) -> Self {
        Self {
            handle,
            webdriver_url: webdriver_url.to_string(),
            session_cookie,
        }
    }
}

impl SessionFactory for ChromeSessionFactory {
    fn create(&self) -> anyhow::Result<Box<dyn BrowserSession>> {
        let client = ChromedriverClient::new(&self.webdriver_url);
        let driver = self
            .handle
            .block_on(client.start_session(harvest_capabilities()))
            .context("starting chromedriver session")?;

        let mut session = ChromeSession {
            handle: self.handle.clone(),
            driver,
        };
        if let Some(value) = &self.session_cookie {
            session.inject_session_cookie(value)?;
        }
        Ok(Box::new(session))
    }
}

pub struct ChromeSession {
    handle: Handle,
    driver: DriverSession,
}

impl BrowserSession for ChromeSession {
    fn open(&mut self, url: &str) -> anyhow::Result<()> {
        let driver = &self.driver;
        self.handle
            .block_on(async {
                driver
                    .execute_cdp("Network.clearBrowserCache", json!({}))
                    .await?;
                driver.navigate("about:blank").await?;
                // Drain entries still buffered from the previous item.
                driver.get_log("performance").await?;
                driver.execute_cdp("Network.enable", json!({})).await?;
                driver.navigate(url).await
            })
            .with_context(|| format!("opening {url}"))
    }

    fn inject_session_cookie(&mut self, value: &str) -> anyhow::Result<()> {
        let driver = &self.driver;
        let cookie = Cookie::session(COOKIE_NAME, value, COOKIE_DOMAIN);
        self.handle
            .block_on(async {
                driver.navigate(COOKIE_PRIME_URL).await?;
                driver.add_cookie(&cookie).await
            })
            .context("injecting session cookie")
    }

    fn trigger_load_more(&mut self) -> anyhow::Result<()> {
        self.handle
            .block_on(self.driver.execute_script(LOAD_MORE_SCRIPT))
            .context("triggering load-more scroll")?;
        Ok(())
    }

    fn read_captured_events(&mut self) -> anyhow::Result<Vec<RawNetworkEvent>> {
        let entries = self
            .handle
            .block_on(self.driver.get_log("performance"))
            .context("reading performance log")?;
        Ok(entries
            .iter()
            .filter_map(|entry| parse_perf_entry(&entry.message))
            .collect())
    }

    fn fetch_event_body(&mut self, request_id: &str) -> anyhow::Result<String> {
        let body = self
            .handle
            .block_on(self.driver.response_body(request_id))
            .with_context(|| format!("fetching body of {request_id}"))?;
        if body.base64_encoded {
            anyhow::bail!("response body is base64-encoded, expected text");
        }
        Ok(body.body)
    }

    fn close(&mut self) {
        if let Err(error) = self.handle.block_on(self.driver.quit()) {
            warn!(%error, "failed to close browser session");
        }
    }
}

/// Response events from one raw performance-log entry. Entries that are not
/// JSON, not response events, or carry no request id yield `None`.
fn parse_perf_entry(message: &str) -> Option<RawNetworkEvent> {
    let parsed: Value = serde_json::from_str(message).ok()?;
    let event = parsed.get("message")?;
    let method = event.get("method")?.as_str()?;
    if !method.contains("Network.response") {
        return None;
    }
    let request_id = event.pointer("/params/requestId")?.as_str()?.to_string();
    let url = event
        .pointer("/params/response/url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some(RawNetworkEvent {
        method: method.to_string(),
        request_id,
        url,
    })
}

/// W3C capabilities for harvesting: performance logging on, images and
/// videos blocked, desktop user agent.
fn harvest_capabilities() -> Value {
    json!({
        "browserName": "chrome",
        "goog:chromeOptions": {
            "args": [
                "--disable-extensions",
                "--disable-gpu",
                "--disable-dev-shm-usage",
                "--disable-browser-side-navigation",
                "--disable-infobars",
                "--mute-audio",
                "--no-sandbox",
                "--user-agent=Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36"
            ],
            "prefs": {
                "profile.managed_default_content_settings.images": 2,
                "profile.managed_default_content_settings.videos": 2
            }
        },
        "goog:loggingPrefs": { "performance": "ALL", "browser": "ALL" }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(method: &str, request_id: Option<&str>, url: &str) -> String {
        let mut params = serde_json::Map::new();
        if let Some(id) = request_id {
            params.insert("requestId".into(), json!(id));
        }
        params.insert("response".into(), json!({ "url": url }));
        json!({ "message": { "method": method, "params": params } }).to_string()
    }

    #[test]
    fn response_received_entries_parse() {
        let raw = entry(
            "Network.responseReceived",
            Some("req-7"),
            "https://www.instagram.com/graphql/query",
        );
        let event = parse_perf_entry(&raw).expect("response event parses");
        assert_eq!(event.request_id, "req-7");
        assert!(event.url.contains("graphql/query"));
    }

    #[test]
    fn non_response_methods_are_ignored() {
        let raw = entry("Network.requestWillBeSent", Some("req-1"), "https://x");
        assert!(parse_perf_entry(&raw).is_none());

        let raw = entry("Page.loadEventFired", Some("req-1"), "https://x");
        assert!(parse_perf_entry(&raw).is_none());
    }

    #[test]
    fn entries_without_request_id_are_ignored() {
        let raw = entry("Network.responseReceived", None, "https://x");
        assert!(parse_perf_entry(&raw).is_none());
    }

    #[test]
    fn garbage_entries_are_ignored() {
        assert!(parse_perf_entry("not json at all").is_none());
        assert!(parse_perf_entry("{}").is_none());
    }

    #[test]
    fn missing_response_url_defaults_to_empty() {
        let raw = json!({
            "message": { "method": "Network.responseReceived", "params": { "requestId": "r" } }
        })
        .to_string();
        let event = parse_perf_entry(&raw).expect("still a response event");
        assert_eq!(event.url, "");
    }
}
