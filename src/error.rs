use reqwest::StatusCode;
use thiserror::Error;

/// Ways a transactions fetch can fail.
///
/// The view only logs these; nothing here is shown to the user.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection refused, timeout, or any other transport failure
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("unexpected status {0}")]
    Status(StatusCode),

    /// The body was not a list of transactions
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The fetch task ended without reporting a result
    #[error("fetch task ended unexpectedly")]
    Aborted,
}
