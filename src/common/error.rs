//! Error types for kvrouter

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Transport Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection failed: {addr}: {reason}")]
    ConnectionFailed { addr: String, reason: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    // === Reply Errors ===
    /// An error reply surfaced as a failure. Displays exactly the reply text.
    #[error("{0}")]
    Server(String),

    #[error("invalid number of responses: expected {expected}, got {actual}")]
    ResponseCount { expected: usize, actual: usize },

    // === Routing Errors ===
    #[error("Invalid redirect: {0}")]
    InvalidRedirect(String),

    #[error("No cluster member listens on port {0}")]
    UnknownNode(u16),

    #[error("Too many redirects: gave up after {0} hops")]
    TooManyRedirects(usize),

    #[error("Cluster has no members")]
    EmptyCluster,

    // === Startup Errors ===
    #[error("timeout")]
    StartupTimeout,

    // === Expectation Errors ===
    #[error("expected '{expected}', got '{actual}'")]
    Mismatch { expected: String, actual: String },

    // === Config Errors ===
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic ===
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Did the call fail below the protocol level?
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::ConnectionFailed { .. } | Error::Protocol(_)
        )
    }

    /// Build a mismatch error from anything printable
    pub fn mismatch(expected: impl std::fmt::Display, actual: impl std::fmt::Display) -> Self {
        Error::Mismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_displays_reply_text() {
        let err = Error::Server("ERR unknown command 'FOO'".into());
        assert_eq!(err.to_string(), "ERR unknown command 'FOO'");
    }

    #[test]
    fn test_startup_timeout_text() {
        assert_eq!(Error::StartupTimeout.to_string(), "timeout");
    }

    #[test]
    fn test_is_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(Error::from(io).is_transport());
        assert!(Error::Protocol("bad frame".into()).is_transport());
        assert!(!Error::Server("ERR".into()).is_transport());
        assert!(!Error::StartupTimeout.is_transport());
    }

    #[test]
    fn test_mismatch_message() {
        let err = Error::mismatch("OK", "<nil>");
        assert_eq!(err.to_string(), "expected 'OK', got '<nil>'");
    }
}
