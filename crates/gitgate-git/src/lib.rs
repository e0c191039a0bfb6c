//! Git-over-SSH dispatch for gitgate.
//!
//! This crate turns an interactive session into a git smart-transport
//! endpoint. [`GitMiddleware`] recognises `git-receive-pack`,
//! `git-upload-pack` and `git-upload-archive`, checks access through an
//! injected [`AccessControl`](gitgate_auth::AccessControl), provisions bare
//! repositories on first push and hands the pack exchange to the system `git`
//! binaries. Failures reach the client as a single pkt-line.
//!
//! ```text
//! session ─► GitMiddleware ─► AccessControl
//!                 │
//!                 ├─ push:  RepoStore::ensure_repository ─► git-receive-pack
//!                 │         ─► git update-server-info ─► ensure_default_branch
//!                 │         ─► push observer
//!                 ├─ fetch: git-upload-pack / git-upload-archive
//!                 └─ always: inner handler
//! ```

mod banner;
mod branch;
mod error;
mod exec;
mod lock;
mod middleware;
mod pktline;
mod report;
mod service;
mod session;
mod store;

pub use banner::BannerMiddleware;
pub use branch::{ensure_default_branch, Normalized};
pub use error::{Failure, GitError};
pub use exec::{run_git, run_git_subcommand};
pub use lock::RepoLock;
pub use middleware::{GitMiddleware, PushObserver};
pub use pktline::PktLine;
pub use report::report_failure;
pub use service::{GitRequest, GitService};
pub use session::{Handler, PassThrough, Session};
pub use store::{Provisioned, RepoStore};

/// Result type for git dispatch operations.
pub type Result<T> = std::result::Result<T, GitError>;
