use std::fmt;

#[derive(Debug)]
pub enum YouTubeError {
    Network(String),
    Api { status: u16, message: String },
    Parse(String),
    NotAuthenticated,
    NotConfigured(String),
    NotFound(String),
    AuthDenied(String),
    Database(String),
}

impl fmt::Display for YouTubeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YouTubeError::Network(msg) => write!(f, "Network error: {}", msg),
            YouTubeError::Api { status, message } => {
                write!(f, "API error ({}): {}", status, message)
            }
            YouTubeError::Parse(msg) => write!(f, "Parse error: {}", msg),
            YouTubeError::NotAuthenticated => write!(f, "Not logged into YouTube"),
            YouTubeError::NotConfigured(what) => write!(f, "Missing configuration: {}", what),
            YouTubeError::NotFound(msg) => write!(f, "Not found: {}", msg),
            YouTubeError::AuthDenied(msg) => write!(f, "Login failed: {}", msg),
            YouTubeError::Database(msg) => write!(f, "Token storage error: {}", msg),
        }
    }
}

impl std::error::Error for YouTubeError {}

impl From<reqwest::Error> for YouTubeError {
    fn from(err: reqwest::Error) -> Self {
        YouTubeError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for YouTubeError {
    fn from(err: serde_json::Error) -> Self {
        YouTubeError::Parse(err.to_string())
    }
}

impl From<sqlx::Error> for YouTubeError {
    fn from(err: sqlx::Error) -> Self {
        YouTubeError::Database(err.to_string())
    }
}
