//! Default branch normalization after the first push.
//!
//! `git init --bare` points HEAD at a branch name chosen by the server's git
//! configuration. If the first push creates other branches, HEAD stays
//! unborn and clones come back empty. This module points HEAD at a branch
//! that actually exists.

use crate::exec::run_git;
use crate::{GitError, Result};
use git2::{BranchType, ErrorCode, Repository};
use std::ffi::OsStr;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// What [`ensure_default_branch`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// HEAD already resolves to a commit; nothing to do.
    AlreadySet,
    /// HEAD was unborn and now points at this branch.
    Renamed(String),
    /// HEAD is unborn and there are no branches to point it at.
    NoBranches,
}

#[derive(Debug)]
enum HeadState {
    Resolved,
    Unborn { first_branch: Option<String> },
}

/// Points an unborn HEAD at the first existing branch.
///
/// Branches are taken in lexicographic order, so the choice does not depend
/// on the order the repository library enumerates them in.
#[instrument(skip(cancel), fields(repo = %repo_path.display()))]
pub async fn ensure_default_branch(
    repo_path: &Path,
    cancel: &CancellationToken,
) -> Result<Normalized> {
    let path = repo_path.to_path_buf();
    let state = tokio::task::spawn_blocking(move || inspect_head(&path))
        .await
        .map_err(|e| GitError::Io(std::io::Error::other(e)))??;

    match state {
        HeadState::Resolved => {
            debug!("HEAD already resolves");
            Ok(Normalized::AlreadySet)
        }
        HeadState::Unborn { first_branch: None } => {
            debug!("HEAD is unborn and no branches exist");
            Ok(Normalized::NoBranches)
        }
        HeadState::Unborn {
            first_branch: Some(branch),
        } => {
            run_git(
                repo_path,
                &[OsStr::new("branch"), OsStr::new("-M"), OsStr::new(&branch)],
                cancel,
            )
            .await?;
            info!(%branch, "set default branch");
            Ok(Normalized::Renamed(branch))
        }
    }
}

fn inspect_head(path: &Path) -> std::result::Result<HeadState, git2::Error> {
    let repo = Repository::open(path)?;

    let mut branches = Vec::new();
    for branch in repo.branches(Some(BranchType::Local))? {
        let (branch, _) = branch?;
        if let Some(name) = branch.name()? {
            branches.push(name.to_string());
        }
    }
    branches.sort();

    let state = match repo.head() {
        Ok(_) => Ok(HeadState::Resolved),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
            Ok(HeadState::Unborn {
                first_branch: branches.into_iter().next(),
            })
        }
        Err(e) => Err(e),
    };
    state
}
