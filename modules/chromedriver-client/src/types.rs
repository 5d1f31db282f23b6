use serde::{Deserialize, Serialize};

/// Cookie payload for `POST /session/{id}/cookie`.
#[derive(Debug, Clone, Serialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    #[serde(rename = "httpOnly")]
    pub http_only: bool,
}

impl Cookie {
    /// A secure, http-only session cookie rooted at `/` on the given domain.
    pub fn session(name: &str, value: &str, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: true,
        }
    }
}

/// One entry from `POST /session/{id}/se/log`. For the `performance` log
/// type, `message` is a JSON-encoded DevTools event.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    pub level: String,
    pub message: String,
    pub timestamp: i64,
}

/// Result of the CDP `Network.getResponseBody` command.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseBody {
    pub body: String,
    #[serde(rename = "base64Encoded")]
    pub base64_encoded: bool,
}
