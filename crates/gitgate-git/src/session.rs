//! Session and handler contracts.
//!
//! The SSH server that owns the connection implements [`Session`]; this
//! crate only reads the command, the authenticated key and the byte streams.

use async_trait::async_trait;
use gitgate_auth::PublicKey;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

/// One connecting client's request.
///
/// Reading yields the client's input and writing sends to the client's
/// output channel.
#[async_trait]
pub trait Session: AsyncRead + AsyncWrite + Send + Unpin {
    /// The command the client asked to run, already split into words.
    fn command(&self) -> &[String];

    /// The verified public key, or `None` for anonymous sessions.
    fn public_key(&self) -> Option<&PublicKey>;

    /// Token cancelled when the session goes away.
    fn cancellation(&self) -> CancellationToken;

    /// The `GIT_PROTOCOL` value the client sent, if any.
    fn git_protocol(&self) -> Option<&str> {
        None
    }

    /// Writes to the client's error channel.
    async fn write_stderr(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Ends the session with an exit status.
    async fn exit(&mut self, status: u32) -> std::io::Result<()>;
}

/// Serves a session.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handles the session. Middlewares call their inner handler when done.
    async fn handle(&self, session: &mut dyn Session);
}

/// Handler that does nothing. Terminates a middleware chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

#[async_trait]
impl Handler for PassThrough {
    async fn handle(&self, _session: &mut dyn Session) {}
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for std::sync::Arc<H> {
    async fn handle(&self, session: &mut dyn Session) {
        (**self).handle(session).await
    }
}
