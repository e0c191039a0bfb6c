//! A [`Session`] over a pair of byte streams.
//!
//! Under OpenSSH the client's channel is the process's stdin and stdout, and
//! its extended data channel is stderr.

use async_trait::async_trait;
use gitgate_auth::PublicKey;
use gitgate_git::Session;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio_util::sync::CancellationToken;

/// Session reading the client's input from `R` and writing its output to `W`.
pub struct StreamSession<R, W> {
    command: Vec<String>,
    key: Option<PublicKey>,
    git_protocol: Option<String>,
    reader: R,
    writer: W,
    cancel: CancellationToken,
    exit_status: Option<u32>,
}

impl<R, W> StreamSession<R, W> {
    /// Creates a session for `command` authenticated with `key`.
    pub fn new(command: Vec<String>, key: Option<PublicKey>, reader: R, writer: W) -> Self {
        Self {
            command,
            key,
            git_protocol: None,
            reader,
            writer,
            cancel: CancellationToken::new(),
            exit_status: None,
        }
    }

    /// Sets the `GIT_PROTOCOL` value forwarded to git.
    pub fn with_git_protocol(mut self, protocol: Option<String>) -> Self {
        self.git_protocol = protocol.filter(|p| !p.is_empty());
        self
    }

    /// Exit status requested by a handler, if any.
    pub fn exit_status(&self) -> Option<u32> {
        self.exit_status
    }

    /// Consumes the session, returning the output stream.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<R: AsyncRead + Unpin, W: Unpin> AsyncRead for StreamSession<R, W> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().reader).poll_read(cx, buf)
    }
}

impl<R: Unpin, W: AsyncWrite + Unpin> AsyncWrite for StreamSession<R, W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().writer).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().writer).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().writer).poll_shutdown(cx)
    }
}

#[async_trait]
impl<R, W> Session for StreamSession<R, W>
where
    R: AsyncRead + Send + Unpin,
    W: AsyncWrite + Send + Unpin,
{
    fn command(&self) -> &[String] {
        &self.command
    }

    fn public_key(&self) -> Option<&PublicKey> {
        self.key.as_ref()
    }

    fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn git_protocol(&self) -> Option<&str> {
        self.git_protocol.as_deref()
    }

    async fn write_stderr(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut stderr = tokio::io::stderr();
        stderr.write_all(buf).await?;
        stderr.flush().await
    }

    async fn exit(&mut self, status: u32) -> io::Result<()> {
        // First status wins.
        self.exit_status.get_or_insert(status);
        self.writer.flush().await
    }
}
