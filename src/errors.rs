use thiserror::Error;

use crate::ai::PromptError;
use crate::youtube::YouTubeError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration missing: {0}")]
    NotConfigured(String),

    #[error("YouTube error: {0}")]
    YouTube(String),

    #[error("AI error: {0}")]
    Prompt(String),

    #[error("Player error: {0}")]
    Player(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Implement From traits for common error types to simplify conversion

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::FileSystem(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(format!("Serialization error: {}", e))
    }
}

impl From<YouTubeError> for AppError {
    fn from(e: YouTubeError) -> Self {
        match e {
            YouTubeError::NotAuthenticated | YouTubeError::AuthDenied(_) => {
                AppError::Auth(e.to_string())
            }
            YouTubeError::NotConfigured(msg) => AppError::NotConfigured(msg),
            YouTubeError::Network(msg) => AppError::Network(msg),
            YouTubeError::Database(msg) => AppError::Database(msg),
            other => AppError::YouTube(other.to_string()),
        }
    }
}

impl From<PromptError> for AppError {
    fn from(e: PromptError) -> Self {
        match e {
            PromptError::NotConfigured(msg) => AppError::NotConfigured(msg),
            PromptError::Network(msg) => AppError::Network(msg),
            PromptError::Database(msg) => AppError::Database(msg),
            other => AppError::Prompt(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Player(e.to_string())
    }
}

impl From<String> for AppError {
    fn from(e: String) -> Self {
        AppError::Internal(e)
    }
}
