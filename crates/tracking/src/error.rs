use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The host element is not attached yet. This is a render-order race, not
    /// a real failure; creation should be retried shortly.
    #[error("map container `{0}` is not in the document yet")]
    ContainerNotReady(String),

    #[error("map engine unavailable: {0}")]
    Unavailable(String),
}

impl EngineError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::ContainerNotReady(_))
    }
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("user location {0} is not a finite coordinate")]
    InvalidUserLocation(String),

    #[error("invalid tracker config: {0}")]
    InvalidConfig(String),

    #[error("tracker config is not valid JSON: {0}")]
    ConfigDecode(#[from] serde_json::Error),
}

impl TrackerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, TrackerError::Engine(e) if e.is_retryable())
    }
}
