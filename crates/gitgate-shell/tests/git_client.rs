//! Real git clients talking to `gitgate-shell` through an ssh stand-in.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const ALICE: &str =
    "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIAEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEB";

struct Server {
    dir: TempDir,
    ssh: PathBuf,
}

impl Server {
    /// Writes an ssh replacement that runs the shell as a forced command would.
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let ssh = dir.path().join("fake-ssh");
        std::fs::write(
            &ssh,
            format!(
                "#!/bin/sh\n# $1 is the host, $2 the remote command\nSSH_ORIGINAL_COMMAND=\"$2\" exec '{}' --key '{}'\n",
                env!("CARGO_BIN_EXE_gitgate-shell"),
                ALICE
            ),
        )
        .unwrap();
        std::fs::set_permissions(&ssh, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir, ssh }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("repos")
    }

    fn log(&self) -> PathBuf {
        self.dir.path().join("gitgate.log")
    }

    fn git(&self, cwd: &Path, args: &[&str]) {
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .env("HOME", self.dir.path())
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("GIT_AUTHOR_NAME", "alice")
            .env("GIT_AUTHOR_EMAIL", "alice@example.com")
            .env("GIT_COMMITTER_NAME", "alice")
            .env("GIT_COMMITTER_EMAIL", "alice@example.com")
            .env("GIT_SSH_COMMAND", &self.ssh)
            .env("GIT_SSH_VARIANT", "simple")
            .env("GITGATE__REPO_ROOT", self.root())
            .env("GITGATE__AUTHORIZED_KEYS", format!("{ALICE} alice\n"))
            .env("GITGATE__LOG_FILE", self.log())
            .env_remove("GITGATE_KEY")
            .env_remove("GITGATE_CONFIG")
            .env_remove("RUST_LOG")
            .output()
            .unwrap();
        assert!(output.status.success(), "git {args:?}: {output:?}");
    }

    fn head(&self, repo: &str) -> String {
        let repo = git2::Repository::open(self.root().join(repo)).unwrap();
        let head = repo.find_reference("HEAD").unwrap();
        head.symbolic_target().unwrap().to_string()
    }
}

#[test]
fn test_push_sets_default_branch_and_clone_follows_it() {
    let server = Server::new();
    let work = server.dir.path().join("work");
    std::fs::create_dir(&work).unwrap();

    server.git(&work, &["init", "-q", "-b", "trunk"]);
    server.git(&work, &["commit", "-q", "--allow-empty", "-m", "first"]);
    server.git(&work, &["branch", "zeta"]);
    server.git(&work, &["branch", "alpha"]);

    // First push: the smallest pushed branch becomes HEAD.
    server.git(&work, &["push", "-q", "gitgate:app.git", "zeta", "alpha"]);
    assert!(server.root().join("app.git/info/refs").is_file());
    assert_eq!(server.head("app.git"), "refs/heads/alpha");

    // Later pushes never move HEAD, even for smaller names.
    server.git(&work, &["branch", "aaa"]);
    server.git(&work, &["push", "-q", "gitgate:app.git", "aaa"]);
    assert_eq!(server.head("app.git"), "refs/heads/alpha");

    let logged = std::fs::read_to_string(server.log()).unwrap();
    assert_eq!(logged.matches("push received").count(), 2, "{logged}");

    server.git(server.dir.path(), &["clone", "-q", "gitgate:app.git", "clone"]);
    let clone = git2::Repository::open(server.dir.path().join("clone")).unwrap();
    assert_eq!(clone.head().unwrap().shorthand(), Some("alpha"));
}
