//! Tests for the pack executor and concurrent provisioning.

mod common;

use common::TestSession;
use gitgate_git::{run_git_subcommand, GitError, Provisioned, RepoStore};
use std::ffi::OsStr;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_session_streams_are_wired_to_subprocess() {
    let mut session = TestSession::new(&[]).with_input(b"hello from the client\n");

    run_git_subcommand(&mut session, Path::new("."), "cat", &[])
        .await
        .unwrap();

    assert_eq!(session.output, b"hello from the client\n");
}

#[tokio::test]
async fn test_nonzero_exit_is_an_error() {
    let mut session = TestSession::new(&[]);

    let result = run_git_subcommand(&mut session, Path::new("."), "false", &[]).await;

    assert!(matches!(result, Err(GitError::CommandFailed { .. })));
}

#[tokio::test]
async fn test_missing_program_is_a_spawn_error() {
    let mut session = TestSession::new(&[]);

    let result =
        run_git_subcommand(&mut session, Path::new("."), "git-no-such-subcommand", &[]).await;

    assert!(matches!(result, Err(GitError::Spawn { .. })));
}

#[tokio::test]
async fn test_cancellation_kills_subprocess() {
    let mut session = TestSession::new(&[]);
    let cancel = session.cancel_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let result = run_git_subcommand(
        &mut session,
        Path::new("."),
        "sleep",
        &[OsStr::new("30")],
    )
    .await;

    assert!(matches!(result, Err(GitError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_pushes_provision_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = RepoStore::new(dir.path().join("repos"));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                let cancel = CancellationToken::new();
                store.ensure_repository("team/app.git", &cancel).await
            })
        })
        .collect();

    let mut created = 0;
    for task in tasks {
        let (path, provisioned) = task.await.unwrap().unwrap();
        assert_eq!(path, dir.path().join("repos/team/app.git"));
        if provisioned == Provisioned::Created {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    let repo = git2::Repository::open(dir.path().join("repos/team/app.git")).unwrap();
    assert!(repo.is_bare());
    assert!(repo.head().is_err(), "fresh repository has an unborn HEAD");

    let locks: Vec<_> = std::fs::read_dir(dir.path().join("repos/.gitgate-locks"))
        .unwrap()
        .collect();
    assert!(locks.is_empty(), "every lock was released");
}

#[tokio::test]
async fn test_cancelled_provisioning_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = RepoStore::new(dir.path().join("repos"));
    let repo_path = store.resolve("app.git").unwrap();

    // Hold the lock so provisioning has to wait, then cancel it.
    let holder = CancellationToken::new();
    let _lock = store.lock(&repo_path, &holder).await.unwrap();

    let cancel = CancellationToken::new();
    let waiter = {
        let store = store.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { store.ensure_repository("app.git", &cancel).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let result = waiter.await.unwrap();
    assert!(matches!(result, Err(GitError::Cancelled)));
    assert!(!repo_path.exists());
}

#[tokio::test]
async fn test_relative_root_provisions_in_place() {
    let dir = tempfile::tempdir_in(".").unwrap();
    assert!(dir.path().is_relative());
    let store = RepoStore::new(dir.path().join("repos"));
    let cancel = CancellationToken::new();

    let (path, provisioned) = store.ensure_repository("app.git", &cancel).await.unwrap();

    assert_eq!(provisioned, Provisioned::Created);
    assert_eq!(path, dir.path().join("repos/app.git"));
    assert!(git2::Repository::open(&path).unwrap().is_bare());
    assert!(!dir.path().join("repos/repos").exists());
}

#[tokio::test]
async fn test_path_spellings_share_one_lock() {
    for alias in ["team/app.git/", "team//app.git", "team/./app.git"] {
        let dir = tempfile::tempdir().unwrap();
        let store = RepoStore::new(dir.path().join("repos"));
        let repo_path = store.resolve("team/app.git").unwrap();

        let holder = CancellationToken::new();
        let lock = store.lock(&repo_path, &holder).await.unwrap();

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                let cancel = CancellationToken::new();
                store.ensure_repository(alias, &cancel).await
            })
        };
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!waiter.is_finished(), "{alias:?} did not wait for the lock");
        assert!(!repo_path.exists());

        drop(lock);
        let (path, provisioned) = tokio::time::timeout(Duration::from_secs(10), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(provisioned, Provisioned::Created);
        assert_eq!(path.as_os_str(), repo_path.as_os_str());
    }
}
