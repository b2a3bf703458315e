/// Errors raised while talking to a lookup API.
///
/// These never reach the host: callers map every variant to an empty result.
/// Only [`LookupError::Transport`] is considered transient and retried.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The request could not complete (connect, timeout, body read)
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// The response was not JSON
    #[error("Unexpected content type {content_type:?} (status {status})")]
    ContentType { status: u16, content_type: String },
    /// The response claimed to be JSON but did not parse
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
    /// Well-formed JSON with `success` missing or false
    #[error("Request rejected by API: {0}")]
    Rejected(String),
    /// A header name or value could not be encoded
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    /// A background worker could not be started
    #[error("Failed to spawn worker: {0}")]
    Spawn(String),
}

impl LookupError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, LookupError::Transport(_))
    }
}
