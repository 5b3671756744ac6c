//! Typed errors for prompt calls.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    /// The prompt service could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// The prompt service answered with a non-success status
    #[error("Prompt service error ({status}): {message}")]
    Api { status: u16, message: String },

    /// No API key for the prompt service
    #[error("Missing configuration: {0}")]
    NotConfigured(String),

    /// The model returned no candidate (blocked or empty)
    #[error("The model returned no output{}", .0.as_deref().map(|r| format!(" ({})", r)).unwrap_or_default())]
    EmptyResponse(Option<String>),

    /// The model output did not match the output schema
    #[error("Model output did not match the expected schema: {0}")]
    InvalidOutput(String),

    /// A template referenced a variable that was not supplied, or is malformed
    #[error("Prompt template error: {0}")]
    Template(String),

    /// Analysis cache read/write failed
    #[error("Database error: {0}")]
    Database(String),
}

impl From<reqwest::Error> for PromptError {
    fn from(e: reqwest::Error) -> Self {
        PromptError::Network(e.to_string())
    }
}

impl From<sqlx::Error> for PromptError {
    fn from(e: sqlx::Error) -> Self {
        PromptError::Database(e.to_string())
    }
}
