//! gitgate shell - serves one git-over-SSH session on stdin/stdout.

use anyhow::Context;
use clap::Parser;
use gitgate_auth::PublicKey;
use gitgate_git::{Handler, Session};
use gitgate_shell::{build_handler, init_logging, split_command, Config, LogFormat, StreamSession};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// gitgate shell - git-over-SSH command dispatch
#[derive(Parser, Debug)]
#[command(name = "gitgate-shell")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "GITGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Public key the SSH server verified, as `<type> <base64>`
    #[arg(long, env = "GITGATE_KEY")]
    key: Option<String>,

    /// Command the client asked to run
    #[arg(long, env = "SSH_ORIGINAL_COMMAND", default_value = "")]
    command: String,

    /// Repository root, overriding the configuration
    #[arg(long)]
    repo_root: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Write logs to stderr when no log file is configured
    #[arg(long)]
    log_stderr: bool,
}

#[tokio::main]
async fn main() {
    let status = match run(Args::parse()).await {
        Ok(status) => status,
        Err(e) => {
            eprintln!("gitgate-shell: {e:#}");
            1
        }
    };
    std::process::exit(i32::try_from(status).unwrap_or(i32::MAX));
}

async fn run(args: Args) -> anyhow::Result<u32> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(root) = args.repo_root {
        config.repo_root = root;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    if args.log_stderr {
        config.log_to_stderr = true;
    }

    init_logging(
        &config.log_level,
        LogFormat::parse(&config.log_format),
        config.log_sink(),
    )
    .context("failed to open log file")?;

    let key = args
        .key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .map(PublicKey::parse)
        .transpose()
        .context("invalid --key")?;

    let access = config.access_control().await?;
    let handler = build_handler(&config, Arc::new(access));

    let mut session = StreamSession::new(
        split_command(&args.command),
        key,
        tokio::io::stdin(),
        tokio::io::stdout(),
    )
    .with_git_protocol(std::env::var("GIT_PROTOCOL").ok());

    tracing::debug!(
        command = ?session.command(),
        repo_root = %config.repo_root.display(),
        "session started"
    );

    let cancel = session.cancellation();
    let signals = tokio::spawn(cancel_on_signal(cancel.clone()));

    handler.handle(&mut session).await;

    signals.abort();
    let status = if cancel.is_cancelled() {
        session.exit_status().unwrap_or(1)
    } else {
        session.exit_status().unwrap_or(0)
    };
    tracing::debug!(status, "session finished");
    Ok(status)
}

/// Cancels `cancel` when the client hangs up or the process is asked to stop.
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let hangup = async {
        use signal::unix::SignalKind;

        let (mut term, mut hup) = match (
            signal::unix::signal(SignalKind::terminate()),
            signal::unix::signal(SignalKind::hangup()),
        ) {
            (Ok(term), Ok(hup)) => (term, hup),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "failed to install signal handlers");
                return std::future::pending::<()>().await;
            }
        };
        tokio::select! {
            _ = term.recv() => tracing::info!("received SIGTERM"),
            _ = hup.recv() => tracing::info!("received SIGHUP"),
        }
    };

    #[cfg(not(unix))]
    let hangup = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = hangup => {}
    }
    cancel.cancel();
}
