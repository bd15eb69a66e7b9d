/// Transport failures raised by the HTTP collaborator.
///
/// These are propagated unmodified through extraction; nothing in the crate
/// retries them.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Resource not found (404): {0}")]
    NotFound(String),
    #[error("Server error {status} from {url}")]
    ServerError { url: String, status: u16 },
    #[error("Unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },
}
