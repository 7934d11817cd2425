//! Error types for the Sonar API client

use std::fmt;

/// Errors that can occur when calling the Sonar GraphQL API
#[derive(Debug)]
pub enum SonarError {
    /// HTTP request failed
    Http(reqwest::Error),
    /// The endpoint answered with a non-success HTTP status
    Status(reqwest::StatusCode),
    /// The GraphQL layer reported an error
    Api(String),
}

impl fmt::Display for SonarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "Sonar HTTP error: {}", e),
            Self::Status(code) => write!(f, "Sonar returned status {}", code),
            Self::Api(msg) => write!(f, "Sonar API error: {}", msg),
        }
    }
}

impl std::error::Error for SonarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SonarError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

/// Result type for Sonar API operations
pub type Result<T> = std::result::Result<T, SonarError>;
