use std::io;
use thiserror::Error;

/// Error types for the MAX! Cube client
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Connection state error: {0}")]
    ConnectionState(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Unsupported message: {0}")]
    UnsupportedMessage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Creates a new connection state error
    pub fn connection_state(msg: impl Into<String>) -> Self {
        Error::ConnectionState(msg.into())
    }

    /// Creates a new timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Error::Timeout(msg.into())
    }

    /// Creates a new unsupported message error
    pub fn unsupported_message(msg: impl Into<String>) -> Self {
        Error::UnsupportedMessage(msg.into())
    }

    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Length check shared by every fixed-size or bounded decoder
    pub fn length_mismatch(what: &str, expected: impl std::fmt::Display, actual: usize) -> Self {
        Error::Validation(format!(
            "{} must be {} bytes in length (is {})",
            what, expected, actual
        ))
    }

    /// Returns true for errors raised while decoding or validating input
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Returns true when a socket operation or discovery ran out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Validation(format!("invalid base64 payload: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::validation("test error");
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(err.to_string(), "Validation error: test error");
        assert!(err.is_validation());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::Other, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_length_mismatch_message() {
        let err = Error::length_mismatch("Identify reply", 26, 10);
        assert_eq!(
            err.to_string(),
            "Validation error: Identify reply must be 26 bytes in length (is 10)"
        );
    }
}
