//! Running the system `git` binaries.
//!
//! Every function here is bound to a [`CancellationToken`]: when the token
//! fires the child is killed instead of being left behind.

use crate::{GitError, Result, Session};
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Runs a git subcommand with the session's streams as its stdin and stdout.
///
/// Client input is pumped into the child until the client closes its side.
/// The call returns once the child has exited and all of its output has been
/// written to the session. A non-zero exit is [`GitError::CommandFailed`];
/// cancellation kills the child and returns [`GitError::Cancelled`].
#[instrument(skip_all, fields(%program, dir = %dir.display()))]
pub async fn run_git_subcommand(
    session: &mut dyn Session,
    dir: &Path,
    program: &str,
    args: &[&OsStr],
) -> Result<()> {
    let cancel = session.cancellation();
    let command = describe(program, args);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    if let Some(protocol) = session.git_protocol() {
        cmd.env("GIT_PROTOCOL", protocol);
    }

    debug!(%command, "spawning pack subprocess");
    let mut child = cmd.spawn().map_err(|source| GitError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::other("child stdin was not piped"))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("child stdout was not piped"))?;
    let (mut input, mut output) = tokio::io::split(&mut *session);

    let outcome = {
        let feed = async move {
            // Dropping stdin at the end closes the pipe, signalling EOF.
            if let Err(e) = tokio::io::copy(&mut input, &mut stdin).await {
                debug!(error = %e, "stopped feeding subprocess stdin");
            }
        };
        let drain = async {
            tokio::io::copy(&mut stdout, &mut output).await?;
            output.flush().await?;
            child.wait().await
        };
        let exchange = async {
            tokio::pin!(feed, drain);
            let mut feeding = true;
            loop {
                tokio::select! {
                    () = &mut feed, if feeding => feeding = false,
                    status = &mut drain => break status,
                }
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            status = exchange => Some(status),
        }
    };

    let Some(status) = outcome else {
        warn!(%command, "session cancelled, killing subprocess");
        let _ = child.kill().await;
        return Err(GitError::Cancelled);
    };

    let status = status?;
    if !status.success() {
        return Err(GitError::CommandFailed {
            command,
            status,
            stderr: String::new(),
        });
    }

    debug!(%command, "pack subprocess finished");
    Ok(())
}

/// Runs `git <args>` in `dir` without touching any session stream.
///
/// Returns stdout. Stderr is captured into the error on failure.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub async fn run_git(dir: &Path, args: &[&OsStr], cancel: &CancellationToken) -> Result<String> {
    let command = describe("git", args);

    let mut cmd = Command::new("git");
    cmd.args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(%command, "running git");
    let child = cmd.spawn().map_err(|source| GitError::Spawn {
        program: "git".to_string(),
        source,
    })?;

    let output = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            warn!(%command, "cancelled, killing git");
            return Err(GitError::Cancelled);
        }
        output = child.wait_with_output() => output?,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::CommandFailed {
            command,
            status: output.status,
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn describe(program: &str, args: &[&OsStr]) -> String {
    let mut command = program.to_string();
    for arg in args {
        command.push(' ');
        command.push_str(&arg.to_string_lossy());
    }
    command
}
