//! On-disk layout of hosted repositories.

use crate::exec::run_git;
use crate::lock::RepoLock;
use crate::{GitError, Result};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Directory under the root that holds repository lock files.
pub const LOCK_DIR: &str = ".gitgate-locks";

/// Default age after which a lock file is considered abandoned.
const DEFAULT_STALE_LOCK_AGE: Duration = Duration::from_secs(60);

/// Result of [`RepoStore::ensure_repository`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    /// A new bare repository was initialised.
    Created,
    /// The repository was already on disk.
    Existing,
}

/// Bare repositories stored below a single root directory.
#[derive(Debug, Clone)]
pub struct RepoStore {
    root: PathBuf,
    stale_lock_age: Duration,
}

impl RepoStore {
    /// Creates a store rooted at `root`. Nothing is created on disk yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            stale_lock_age: DEFAULT_STALE_LOCK_AGE,
        }
    }

    /// Sets how old a lock file must be before it is broken.
    pub fn with_stale_lock_age(mut self, age: Duration) -> Self {
        self.stale_lock_age = age;
        self
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a client-supplied repository identifier to its path.
    ///
    /// A leading `/` is ignored, so `/team/app.git` and `team/app.git` name
    /// the same repository. Identifiers that would escape the root, or that
    /// name the lock directory, are rejected.
    pub fn resolve(&self, repo: &str) -> Result<PathBuf> {
        let relative = Path::new(repo.trim_start_matches('/'));
        let invalid = || GitError::InvalidRepository(repo.to_string());

        let mut components = relative.components();
        match components.next() {
            Some(Component::Normal(first)) if first != OsStr::new(LOCK_DIR) => {}
            _ => return Err(invalid()),
        }
        if !components.all(|c| matches!(c, Component::Normal(_))) {
            return Err(invalid());
        }

        // Rebuilt from components so every spelling of a directory maps to one
        // path, and so to one lock.
        Ok(self.root.join(relative.components().collect::<PathBuf>()))
    }

    /// Returns true if `path` exists.
    pub async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(tokio::fs::try_exists(path).await?)
    }

    /// Creates the root directory with owner-only permissions if missing.
    pub async fn ensure_root(&self) -> Result<()> {
        if self.exists(&self.root).await? {
            return Ok(());
        }

        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder.create(&self.root).await?;

        info!(root = %self.root.display(), "created repository root");
        Ok(())
    }

    /// Takes the advisory lock for a repository path.
    pub async fn lock(&self, repo_path: &Path, cancel: &CancellationToken) -> Result<RepoLock> {
        RepoLock::acquire(
            &self.root.join(LOCK_DIR),
            repo_path,
            self.stale_lock_age,
            cancel,
        )
        .await
    }

    /// Makes sure the root and the bare repository for `repo` exist.
    ///
    /// Initialisation happens under the repository lock, so concurrent first
    /// pushes create the repository exactly once. Returns the repository path.
    #[instrument(skip(self, cancel))]
    pub async fn ensure_repository(
        &self,
        repo: &str,
        cancel: &CancellationToken,
    ) -> Result<(PathBuf, Provisioned)> {
        let path = self.resolve(repo)?;
        self.ensure_root().await?;

        if self.exists(&path).await? {
            return Ok((path, Provisioned::Existing));
        }

        let _lock = self.lock(&path, cancel).await?;
        if self.exists(&path).await? {
            debug!("repository created while waiting for the lock");
            return Ok((path, Provisioned::Existing));
        }

        // `path` already includes the root, so run from the working directory.
        run_git(
            Path::new("."),
            &[OsStr::new("init"), OsStr::new("--bare"), path.as_os_str()],
            cancel,
        )
        .await?;

        info!(path = %path.display(), "initialized bare repository");
        Ok((path, Provisioned::Created))
    }
}
