//! Git dispatch error types.

use std::process::ExitStatus;
use thiserror::Error;

/// Errors that can occur while serving a git command.
///
/// These carry full detail for the logs. Clients only ever see the
/// [`Failure`] they collapse to.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository identifier does not name a path below the root.
    #[error("invalid repository identifier: {0:?}")]
    InvalidRepository(String),

    /// A subprocess could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A subprocess exited unsuccessfully.
    #[error("{command} failed ({status}): {stderr}")]
    CommandFailed {
        /// The command line that was run.
        command: String,
        /// Exit status.
        status: ExitStatus,
        /// Captured stderr, if any.
        stderr: String,
    },

    /// The session was cancelled while work was in flight.
    #[error("session cancelled")]
    Cancelled,

    /// Repository library error.
    #[error("repository error: {0}")]
    Repository(#[from] git2::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The failures a client can be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Failure {
    /// The key's access level does not cover the requested operation.
    #[error("you are not authorized to do this")]
    NotAuthorized,

    /// Anything else. Details stay in the server logs.
    #[error("something went wrong")]
    Internal,
}

impl From<&GitError> for Failure {
    fn from(_: &GitError) -> Self {
        Failure::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            Failure::NotAuthorized.to_string(),
            "you are not authorized to do this"
        );
        assert_eq!(Failure::Internal.to_string(), "something went wrong");
    }

    #[test]
    fn test_every_error_is_internal() {
        let errors = [
            GitError::InvalidRepository("../etc".into()),
            GitError::Cancelled,
            GitError::Io(std::io::Error::other("disk on fire")),
        ];
        for err in &errors {
            assert_eq!(Failure::from(err), Failure::Internal);
            assert!(!Failure::from(err).to_string().contains("disk"));
        }
    }
}
