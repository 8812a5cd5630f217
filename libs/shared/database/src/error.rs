use thiserror::Error;

/// Failures raised by a persistence backend. All of them are transient from
/// the booking engine's point of view: no partial state is implied.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("storage API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("storage payload error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage misconfigured: {0}")]
    Configuration(String),

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}
