use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChromedriverError>;

#[derive(Debug, Error)]
pub enum ChromedriverError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("WebDriver error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ChromedriverError {
    /// Build an `Api` error from a raw WebDriver error body, pulling out
    /// `value.message` when the body is the standard error envelope.
    pub(crate) fn api(status: u16, body: String) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.pointer("/value/message")
                    .and_then(|m| m.as_str().map(String::from))
            })
            .unwrap_or(body);
        ChromedriverError::Api { status, message }
    }
}

impl From<reqwest::Error> for ChromedriverError {
    fn from(err: reqwest::Error) -> Self {
        ChromedriverError::Network(err.to_string())
    }
}
