use super::message::CallId;

/// Result type for operations that can be rejected before any network activity
pub type ClientResult<T> = Result<T, ClientError>;

/// Contract violations detected synchronously, before a dispatch begins.
///
/// These are never delivered through a future: the call that detected the
/// problem returns them directly.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("RPC call must have a non-empty method name")]
    MissingMethod,

    #[error("Empty json-rpc request")]
    EmptyDispatch,

    #[error("Ambiguous json-rpc client: batch is already bound to a client")]
    AmbiguousClient,

    #[error("Json-rpc client not specified")]
    MissingClient,

    #[error("Duplicate call id in batch: {0}")]
    DuplicateId(CallId),

    #[error("Request encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("No async runtime available to drive the dispatch")]
    NoRuntime,

    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("HTTP client setup failed: {0}")]
    HttpSetup(#[source] reqwest::Error),
}

/// Failures reported by a transport collaborator.
///
/// The engine does not distinguish between variants: every one of them
/// resolves the dispatch with `REQUEST_SEND_ERROR`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("Timeout")]
    Timeout,

    #[error("Connection closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}
