//! Error types for api-gate
//!
//! Most network trouble never reaches the caller as an error: transport failures are
//! folded into sentinel [`ResponseRecord`](crate::session::ResponseRecord)s and remote
//! 4xx/5xx listing pages simply contribute no items. What remains here are the failures
//! a caller must see:
//! - malformed request descriptors and targets
//! - broken access trees and ambiguous access lookups
//! - a corrupt cache file
//! - transport errors, but only when the session is configured to raise them

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for api-gate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for api-gate
#[derive(Debug, Error)]
pub enum Error {
    /// A bulk request element could not be turned into a request descriptor
    #[error("invalid request shape at index {index}: {reason}")]
    InvalidRequestShape {
        /// Position of the offending element in the caller's input
        index: usize,
        /// What was wrong with it
        reason: String,
    },

    /// A URL did not pass absolute-URL validation
    #[error("invalid URL {0}")]
    InvalidTarget(String),

    /// More than one lookup key matched at the same depth of an access tree
    #[error("invalid access structure: {principal} hit on multiple keys {keys:?}")]
    AmbiguousAccessPath {
        /// Identifier of the principal being evaluated
        principal: String,
        /// The keys that matched simultaneously
        keys: Vec<String>,
    },

    /// Access tree was not a mapping
    #[error("access tree must be a mapping, got {0}")]
    InvalidAccessTree(String),

    /// Re-authentication hook failed
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Cache file exists but does not hold a valid JSON item list
    #[error("corrupt cache file {path}: {source}")]
    CacheCorrupt {
        /// Cache file path
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrency")
        key: Option<String>,
    },

    /// Network error (only surfaced when the session raises transport errors)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns true for failures that happened on the wire rather than in the caller's input
    ///
    /// These are the errors a session converts into sentinel responses unless it is
    /// configured to raise them.
    pub fn is_transport(&self) -> bool {
        match self {
            Error::Network(e) => !e.is_builder(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
            ),
            Error::InvalidRequestShape { .. }
            | Error::InvalidTarget(_)
            | Error::AmbiguousAccessPath { .. }
            | Error::InvalidAccessTree(_)
            | Error::Authentication(_)
            | Error::CacheCorrupt { .. }
            | Error::Config { .. }
            | Error::Serialization(_) => false,
        }
    }
}
