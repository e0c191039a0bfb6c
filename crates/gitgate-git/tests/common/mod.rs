//! In-memory session used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use gitgate_auth::{AccessControl, AccessLevel, PublicKey};
use gitgate_git::{Handler, Session};
use std::io::Cursor;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::sync::CancellationToken;

pub const ALICE: &str =
    "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIAEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEB";

pub fn alice() -> PublicKey {
    PublicKey::parse(ALICE).unwrap()
}

pub struct TestSession {
    command: Vec<String>,
    key: Option<PublicKey>,
    input: Cursor<Vec<u8>>,
    cancel: CancellationToken,
    pub output: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_status: Option<u32>,
}

impl TestSession {
    pub fn new(command: &[&str]) -> Self {
        Self {
            command: command.iter().map(|w| w.to_string()).collect(),
            key: None,
            input: Cursor::new(Vec::new()),
            cancel: CancellationToken::new(),
            output: Vec::new(),
            stderr: Vec::new(),
            exit_status: None,
        }
    }

    pub fn with_key(mut self, key: PublicKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_input(mut self, input: &[u8]) -> Self {
        self.input = Cursor::new(input.to_vec());
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl AsyncRead for TestSession {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().input).poll_read(cx, buf)
    }
}

impl AsyncWrite for TestSession {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.get_mut().output).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl Session for TestSession {
    fn command(&self) -> &[String] {
        &self.command
    }

    fn public_key(&self) -> Option<&PublicKey> {
        self.key.as_ref()
    }

    fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn write_stderr(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.stderr.extend_from_slice(buf);
        Ok(())
    }

    async fn exit(&mut self, status: u32) -> std::io::Result<()> {
        self.exit_status = Some(status);
        Ok(())
    }
}

/// Grants a fixed level and counts how often it was asked.
pub struct FixedAccess {
    level: AccessLevel,
    calls: AtomicUsize,
}

impl FixedAccess {
    pub fn new(level: AccessLevel) -> Arc<Self> {
        Arc::new(Self {
            level,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessControl for FixedAccess {
    async fn auth_repo(&self, _repo: &str, _key: Option<&PublicKey>) -> AccessLevel {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.level
    }
}

/// Terminal handler that records it was reached.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler for Recorder {
    async fn handle(&self, _session: &mut dyn Session) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}
