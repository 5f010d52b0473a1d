use crate::reclamation::schema::ValidationError;
use std::fmt;
use thiserror::Error;

/// Server error keys that get dedicated handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKey {
    NameAlreadyUsed,
    Other(String),
}

impl ErrorKey {
    pub fn parse(key: &str) -> Self {
        match key {
            "name_already_used" => ErrorKey::NameAlreadyUsed,
            other => ErrorKey::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKey::NameAlreadyUsed => write!(f, "name_already_used"),
            ErrorKey::Other(key) => write!(f, "{}", key),
        }
    }
}

// Clone is required: one shared fetch hands its result to every joined caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid server payload: {0}")]
    Validation(#[from] ValidationError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server rejected request ({status}): {message}")]
    Rejected {
        status: u16,
        error_key: Option<ErrorKey>,
        message: String,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn error_key(&self) -> Option<&ErrorKey> {
        match self {
            Error::Rejected { error_key, .. } => error_key.as_ref(),
            _ => None,
        }
    }

    pub fn is_name_already_used(&self) -> bool {
        matches!(self.error_key(), Some(ErrorKey::NameAlreadyUsed))
    }

    /// Only transport failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {}", err))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_already_used_detection() {
        let err = Error::Rejected {
            status: 400,
            error_key: Some(ErrorKey::parse("name_already_used")),
            message: "Bad Request".to_string(),
        };
        assert!(err.is_name_already_used());
        assert!(!err.is_retryable());

        let other = Error::Rejected {
            status: 400,
            error_key: Some(ErrorKey::parse("link_invalid")),
            message: "Bad Request".to_string(),
        };
        assert!(!other.is_name_already_used());
        assert_eq!(other.error_key().map(|k| k.to_string()), Some("link_invalid".to_string()));
    }

    #[test]
    fn test_network_errors_are_retryable() {
        assert!(Error::Network("connection refused".to_string()).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
    }
}
