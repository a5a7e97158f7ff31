/// Error types for the tunefeed core
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CoreError::Upstream(format!("Request timed out: {}", err))
        } else {
            CoreError::Upstream(err.to_string())
        }
    }
}

impl CoreError {
    /// Short human-readable message suitable for a user-visible notification.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Unauthenticated => "Please log in to continue".to_string(),
            CoreError::InvalidInput(msg) => msg.clone(),
            CoreError::Upstream(_) => "Something went wrong, please try again".to_string(),
            CoreError::RateLimited(_) => "Too many requests, please wait a moment".to_string(),
            CoreError::Config(msg) => msg.clone(),
        }
    }
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
