//! Per-repository advisory locks.
//!
//! Lock files are created with create-new semantics, so the lock holds across
//! every process sharing the repository root, not just within one server.

use crate::{GitError, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How often a waiter retries a held lock.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Guard for an acquired repository lock. The lock file is removed on drop.
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
}

impl RepoLock {
    /// Acquires the lock for `repo_path`, waiting while another holder has it.
    ///
    /// A lock file older than `stale_after` is treated as left behind by a
    /// dead process and broken. Returns [`GitError::Cancelled`] if `cancel`
    /// fires first.
    pub async fn acquire(
        lock_dir: &Path,
        repo_path: &Path,
        stale_after: Duration,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        tokio::fs::create_dir_all(lock_dir).await?;
        let path = lock_dir.join(lock_file_name(repo_path));

        loop {
            let opened = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match opened {
                Ok(mut file) => {
                    // The guard removes the file again if recording the owner fails.
                    let lock = Self { path };
                    file.write_all(format!("{}\n", std::process::id()).as_bytes())
                        .await?;
                    file.flush().await?;
                    debug!(lock = %lock.path.display(), repo = %repo_path.display(), "lock acquired");
                    return Ok(lock);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    match staleness(&path, stale_after).await {
                        Staleness::Held => {}
                        Staleness::Gone => continue,
                        Staleness::Abandoned(modified) => {
                            warn!(lock = %path.display(), "breaking abandoned repository lock");
                            break_lock(&path, modified).await;
                            continue;
                        }
                    }
                }
                Err(e) => return Err(e.into()),
            }

            tokio::select! {
                () = cancel.cancelled() => return Err(GitError::Cancelled),
                () = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "failed to release repository lock");
        }
    }
}

fn lock_file_name(repo_path: &Path) -> String {
    let digest = Sha256::digest(repo_path.to_string_lossy().as_bytes());
    format!("{}.lock", hex::encode(digest))
}

#[derive(Debug)]
enum Staleness {
    /// Held by a live owner.
    Held,
    /// Older than the stale age; carries the modification time seen.
    Abandoned(SystemTime),
    /// Vanished between the open and the stat.
    Gone,
}

async fn staleness(path: &Path, stale_after: Duration) -> Staleness {
    let Ok(metadata) = tokio::fs::metadata(path).await else {
        return Staleness::Gone;
    };
    let Ok(modified) = metadata.modified() else {
        return Staleness::Held;
    };
    // A timestamp in the future counts as brand new.
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or_default();
    if age >= stale_after {
        Staleness::Abandoned(modified)
    } else {
        Staleness::Held
    }
}

/// Removes an abandoned lock file last seen with modification time `seen`.
///
/// The file is first renamed aside, which only one breaker can do. If what
/// was moved turns out to be a fresh lock taken in the meantime, it is linked
/// back into place.
async fn break_lock(path: &Path, seen: SystemTime) {
    static BREAKS: AtomicU64 = AtomicU64::new(0);

    let aside = path.with_extension(format!(
        "broken.{}.{}",
        std::process::id(),
        BREAKS.fetch_add(1, Ordering::Relaxed)
    ));
    if tokio::fs::rename(path, &aside).await.is_err() {
        // Someone else broke or released it first.
        return;
    }

    let moved = tokio::fs::metadata(&aside)
        .await
        .and_then(|m| m.modified())
        .ok();
    if moved != Some(seen) {
        if let Err(e) = tokio::fs::hard_link(&aside, path).await {
            warn!(lock = %path.display(), error = %e, "failed to restore a live repository lock");
        }
    }
    let _ = tokio::fs::remove_file(&aside).await;
}
