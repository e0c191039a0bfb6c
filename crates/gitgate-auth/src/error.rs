//! Error types for the auth crate.

use thiserror::Error;

/// Errors that can occur while reading keys and access settings.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A public key could not be decoded.
    #[error("invalid public key: {0}")]
    InvalidKey(String),

    /// A line of an authorized keys list could not be parsed.
    #[error("authorized keys line {line}: {reason}")]
    InvalidLine {
        /// One-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// An access level name was not recognised.
    #[error("unknown access level: {0}")]
    UnknownAccessLevel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;
