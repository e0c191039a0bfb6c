//! # gitgate shell
//!
//! Serves one git-over-SSH session on stdin/stdout. The SSH server handles
//! transport and key verification, then runs this binary as a forced
//! command:
//!
//! ```text
//! command="gitgate-shell --key 'ssh-ed25519 AAAA...'",no-pty ssh-ed25519 AAAA... alice
//! ```
//!
//! The client's requested command arrives in `SSH_ORIGINAL_COMMAND`.
//!
//! ## Modules
//!
//! - [`config`] - Configuration loading and validation
//! - [`logging`] - Structured logging initialization
//! - [`session`] - Stream-backed [`Session`](gitgate_git::Session)
//! - [`command`] - Splitting the SSH command line

pub mod command;
pub mod config;
pub mod logging;
pub mod session;

pub use command::split_command;
pub use config::{Config, ConfigError};
pub use logging::{init_logging, LogFormat, LogSink};
pub use session::StreamSession;

use gitgate_auth::AccessControl;
use gitgate_git::{BannerMiddleware, GitMiddleware, Handler, PassThrough, RepoStore};
use std::sync::Arc;

/// Builds the handler chain described by `config`.
///
/// Git dispatch runs first; the banner, if configured, is printed after it.
pub fn build_handler(
    config: &Config,
    access: Arc<dyn AccessControl>,
) -> GitMiddleware<Arc<dyn Handler>> {
    let inner: Arc<dyn Handler> = match &config.banner {
        Some(banner) => Arc::new(BannerMiddleware::new(banner.clone(), PassThrough)),
        None => Arc::new(PassThrough),
    };

    let store = RepoStore::new(&config.repo_root).with_stale_lock_age(config.stale_lock_age());

    GitMiddleware::with_store(store, access, inner).with_push_observer(|repo, key| {
        tracing::info!(
            %repo,
            key = %key.map(|k| k.fingerprint()).unwrap_or_else(|| "anonymous".to_string()),
            "push received"
        );
    })
}
