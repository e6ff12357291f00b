use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    Validation(String),

    #[error("An unknown error occurred. {0}")]
    Unknown(String),
}

impl RateError {
    pub fn invalid_payload() -> Self {
        Self::Validation("invalid ticker payload".to_string())
    }

    pub fn invalid_rate() -> Self {
        Self::Validation("invalid rate".to_string())
    }

    pub fn invalid_stored_data() -> Self {
        Self::Validation("invalid stored data".to_string())
    }
}

impl From<reqwest::Error> for RateError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            // body arrived but was not the JSON shape we asked for
            return Self::invalid_payload();
        }
        Self::Network(format!("Could not connect to the API. {e}"))
    }
}

impl From<std::io::Error> for RateError {
    fn from(e: std::io::Error) -> Self {
        Self::Network(format!("storage I/O failed: {e}"))
    }
}

/// Errors a session reports back to whoever pressed the button.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("operation already in flight")]
    Busy,

    #[error("no current rate to save")]
    NoCurrentRate,

    #[error("session closed")]
    Closed,
}
