//! Error types for the canary

use std::fmt;

pub type Result<T> = std::result::Result<T, CanaryError>;

#[derive(Debug)]
pub enum CanaryError {
    /// IO operation failed
    Io(std::io::Error),

    /// HTTP request failed
    Http(reqwest::Error),

    /// JSON serialization/deserialization failed
    Json(serde_json::Error),

    /// Configuration error
    Config(String),

    /// Target input could not be interpreted as a name to URL mapping
    InvalidTargets(String),

    /// Metrics sink rejected or failed a submission
    Metrics(String),

    /// Log store rejected or failed a write
    Store(String),

    /// Log store already holds an object under the key
    AlreadyExists(String),
}

impl fmt::Display for CanaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanaryError::Io(err) => write!(f, "IO error: {}", err),
            CanaryError::Http(err) => write!(f, "HTTP error: {}", err),
            CanaryError::Json(err) => write!(f, "JSON error: {}", err),
            CanaryError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CanaryError::InvalidTargets(msg) => write!(f, "Invalid targets: {}", msg),
            CanaryError::Metrics(msg) => write!(f, "Metrics error: {}", msg),
            CanaryError::Store(msg) => write!(f, "Store error: {}", msg),
            CanaryError::AlreadyExists(key) => write!(f, "Object already exists: {}", key),
        }
    }
}

impl std::error::Error for CanaryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CanaryError::Io(err) => Some(err),
            CanaryError::Http(err) => Some(err),
            CanaryError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CanaryError {
    fn from(err: std::io::Error) -> Self {
        CanaryError::Io(err)
    }
}

impl From<reqwest::Error> for CanaryError {
    fn from(err: reqwest::Error) -> Self {
        CanaryError::Http(err)
    }
}

impl From<serde_json::Error> for CanaryError {
    fn from(err: serde_json::Error) -> Self {
        CanaryError::Json(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            CanaryError::Config("LOG_BUCKET cannot be empty".to_string()).to_string(),
            "Configuration error: LOG_BUCKET cannot be empty"
        );
        assert_eq!(
            CanaryError::Store("denied".to_string()).to_string(),
            "Store error: denied"
        );
    }

    #[test]
    fn test_io_error_source() {
        let err = CanaryError::from(std::io::Error::other("disk gone"));
        assert!(err.source().is_some());
        assert!(CanaryError::Metrics("x".to_string()).source().is_none());
    }
}
