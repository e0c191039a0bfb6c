//! Farewell banner.

use crate::{Handler, Session};
use async_trait::async_trait;
use tracing::debug;

/// Prints a banner on the client's stderr once the inner handler is done.
///
/// Stderr keeps the text out of the pack stream, so the banner is safe to
/// show after git commands as well.
#[derive(Debug, Clone)]
pub struct BannerMiddleware<H> {
    banner: String,
    inner: H,
}

impl<H: Handler> BannerMiddleware<H> {
    /// Wraps `inner`, printing `banner` after it.
    pub fn new(banner: impl Into<String>, inner: H) -> Self {
        Self {
            banner: banner.into(),
            inner,
        }
    }
}

#[async_trait]
impl<H: Handler> Handler for BannerMiddleware<H> {
    async fn handle(&self, session: &mut dyn Session) {
        self.inner.handle(session).await;

        let mut text = self.banner.clone();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        if let Err(e) = session.write_stderr(text.as_bytes()).await {
            debug!(error = %e, "failed to write banner");
        }
    }
}
