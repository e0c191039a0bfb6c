//! The git command dispatcher.

use crate::branch::ensure_default_branch;
use crate::exec::{run_git, run_git_subcommand};
use crate::report::report_failure;
use crate::{Failure, GitRequest, GitService, Handler, Provisioned, RepoStore, Result, Session};
use async_trait::async_trait;
use gitgate_auth::{AccessControl, AccessLevel, PublicKey};
use std::ffi::OsStr;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Called after every successful push with the repository identifier and the
/// pushing key.
pub type PushObserver = Arc<dyn Fn(&str, Option<&PublicKey>) + Send + Sync>;

/// Serves git commands, then hands the session to the inner handler.
///
/// Sessions whose command is not `(git-service, repository)` pass straight
/// through. Whatever happens to the git command, the inner handler runs
/// afterwards, even when the session has already been told to exit.
pub struct GitMiddleware<H> {
    store: RepoStore,
    access: Arc<dyn AccessControl>,
    on_push: Option<PushObserver>,
    inner: H,
}

impl<H: Handler> GitMiddleware<H> {
    /// Serves repositories stored under `root`.
    pub fn new(root: impl Into<PathBuf>, access: Arc<dyn AccessControl>, inner: H) -> Self {
        Self::with_store(RepoStore::new(root), access, inner)
    }

    /// Serves repositories from an already configured store.
    pub fn with_store(store: RepoStore, access: Arc<dyn AccessControl>, inner: H) -> Self {
        Self {
            store,
            access,
            on_push: None,
            inner,
        }
    }

    /// Calls `observer` after every successful push.
    pub fn with_push_observer(
        mut self,
        observer: impl Fn(&str, Option<&PublicKey>) + Send + Sync + 'static,
    ) -> Self {
        self.on_push = Some(Arc::new(observer));
        self
    }

    /// Returns the repository store.
    pub fn store(&self) -> &RepoStore {
        &self.store
    }

    async fn dispatch(&self, session: &mut dyn Session) {
        let Some(request) = GitRequest::parse(session.command()) else {
            return;
        };

        let key = session.public_key().cloned();
        let fingerprint = key
            .as_ref()
            .map(PublicKey::fingerprint)
            .unwrap_or_else(|| "anonymous".to_string());
        let span = info_span!(
            "git",
            service = %request.service,
            repo = %request.repo,
            key = %fingerprint,
            access = tracing::field::Empty,
        );

        self.serve(session, request, key).instrument(span).await
    }

    async fn serve(
        &self,
        session: &mut dyn Session,
        request: GitRequest,
        key: Option<PublicKey>,
    ) {
        let access = self.access.auth_repo(&request.repo, key.as_ref()).await;
        tracing::Span::current().record("access", tracing::field::display(access));

        if !permitted(request.service, access) {
            warn!("access denied");
            report_failure(session, Failure::NotAuthorized).await;
            return;
        }

        let result = if request.service.is_push() {
            self.receive_pack(session, &request.repo).await
        } else {
            self.upload_pack(session, request.service, &request.repo).await
        };

        match result {
            Ok(()) => {
                info!("git command completed");
                if request.service.is_push() {
                    self.notify_push(&request.repo, key.as_ref());
                }
            }
            Err(err) => {
                error!(error = %err, "git command failed");
                report_failure(session, Failure::from(&err)).await;
            }
        }
    }

    async fn receive_pack(&self, session: &mut dyn Session, repo: &str) -> Result<()> {
        let cancel = session.cancellation();

        let (path, provisioned) = self.store.ensure_repository(repo, &cancel).await?;
        if provisioned == Provisioned::Created {
            info!(path = %path.display(), "provisioned repository on first push");
        }

        run_git_subcommand(
            session,
            Path::new("."),
            GitService::ReceivePack.as_str(),
            &[path.as_os_str()],
        )
        .await?;

        run_git(&path, &[OsStr::new("update-server-info")], &cancel).await?;

        let _lock = self.store.lock(&path, &cancel).await?;
        let normalized = ensure_default_branch(&path, &cancel).await?;
        debug!(?normalized, "default branch checked");
        Ok(())
    }

    async fn upload_pack(
        &self,
        session: &mut dyn Session,
        service: GitService,
        repo: &str,
    ) -> Result<()> {
        let path = self.store.resolve(repo)?;
        if !self.store.exists(&path).await? {
            debug!(path = %path.display(), "repository does not exist, nothing to serve");
            return Ok(());
        }

        run_git_subcommand(
            session,
            Path::new("."),
            service.as_str(),
            &[path.as_os_str()],
        )
        .await
    }

    fn notify_push(&self, repo: &str, key: Option<&PublicKey>) {
        let Some(observer) = &self.on_push else {
            return;
        };
        if std::panic::catch_unwind(AssertUnwindSafe(|| observer(repo, key))).is_err() {
            error!(%repo, "push observer panicked");
        }
    }
}

fn permitted(service: GitService, access: AccessLevel) -> bool {
    match service {
        GitService::ReceivePack => access.allows_push(),
        GitService::UploadPack | GitService::UploadArchive => access.allows_fetch(),
    }
}

#[async_trait]
impl<H: Handler> Handler for GitMiddleware<H> {
    async fn handle(&self, session: &mut dyn Session) {
        self.dispatch(session).await;
        self.inner.handle(session).await;
    }
}
