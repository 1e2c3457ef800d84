use thiserror::Error;

/// Failure to obtain a usable snapshot from the position feed.
///
/// None of these are fatal to the view; see [`crate::snapshot_or_empty`].
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Transport(String),

    #[error("feed responded with HTTP {0}")]
    Status(u16),

    #[error("feed payload is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("feed payload is not a JSON array")]
    NotAnArray,
}
