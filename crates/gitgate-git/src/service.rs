//! Recognising git transport commands.

use std::fmt;

/// The git services a client can request over SSH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitService {
    /// Push.
    ReceivePack,
    /// Fetch and clone.
    UploadPack,
    /// `git archive --remote`.
    UploadArchive,
}

impl GitService {
    /// Returns the program name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            GitService::ReceivePack => "git-receive-pack",
            GitService::UploadPack => "git-upload-pack",
            GitService::UploadArchive => "git-upload-archive",
        }
    }

    /// Parses a program name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "git-receive-pack" => Some(GitService::ReceivePack),
            "git-upload-pack" => Some(GitService::UploadPack),
            "git-upload-archive" => Some(GitService::UploadArchive),
            _ => None,
        }
    }

    /// Whether this service writes to the repository.
    pub fn is_push(&self) -> bool {
        matches!(self, GitService::ReceivePack)
    }
}

impl fmt::Display for GitService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `(service, repository)` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRequest {
    /// Requested service.
    pub service: GitService,
    /// Repository identifier exactly as the client sent it.
    pub repo: String,
}

impl GitRequest {
    /// Parses a session command.
    ///
    /// Only a two-word command whose first word is a known service is a git
    /// request; anything else is left to other handlers.
    pub fn parse(command: &[String]) -> Option<Self> {
        match command {
            [program, repo] => GitService::parse(program).map(|service| Self {
                service,
                repo: repo.clone(),
            }),
            _ => None,
        }
    }
}
