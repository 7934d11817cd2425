//! Error types for the bridge service

use std::fmt;

#[derive(Debug)]
pub enum BridgeError {
    /// Submitted address field was not a recognizable geocoded payload
    Extraction(String),
    /// A required role has no field id configured for this form
    MissingMapping(&'static str),
    /// A configured field id is absent from the submitted field set
    MissingField(String),
    Config(String),
    Io(std::io::Error),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::Extraction(msg) => write!(f, "Address extraction failed: {}", msg),
            BridgeError::MissingMapping(role) => {
                write!(f, "No field mapped for {}", role)
            }
            BridgeError::MissingField(id) => {
                write!(f, "Mapped field {} missing from submission", id)
            }
            BridgeError::Config(msg) => write!(f, "Configuration error: {}", msg),
            BridgeError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BridgeError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io(err)
    }
}

impl From<tracing_subscriber::filter::ParseError> for BridgeError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        BridgeError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
