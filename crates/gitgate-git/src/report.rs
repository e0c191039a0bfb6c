//! Reporting failures to git clients.

use crate::{Failure, PktLine, Session};
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Sends `failure` as a single pkt-line and exits the session with status 1.
///
/// Git clients print the line as the remote's error. Write errors are only
/// logged: the client may already be gone.
pub async fn report_failure(session: &mut dyn Session, failure: Failure) {
    let packet = PktLine::line(&failure.to_string()).encode();

    if let Err(e) = session.write_all(&packet).await {
        warn!(error = %e, "failed to write failure to client");
    } else if let Err(e) = session.flush().await {
        warn!(error = %e, "failed to flush failure to client");
    }

    if let Err(e) = session.exit(1).await {
        warn!(error = %e, "failed to exit session");
    }
}
