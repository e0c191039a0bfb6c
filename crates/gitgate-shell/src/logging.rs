//! Structured logging initialization.
//!
//! A forced command's stderr is relayed to the SSH client, so logs only go
//! there when asked for. Deployments point logs at a file with `log_file`.

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log records go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink<'a> {
    /// Appended to a file.
    File(&'a Path),
    /// Written to stderr, which the SSH client sees.
    Stderr,
    /// Not recorded at all.
    Disabled,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format.
    Pretty,
    /// JSON lines.
    Json,
}

impl LogFormat {
    /// Parse log format from string, defaulting to pretty.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Builds the default filter directive for `level`.
fn default_directive(level: &str) -> String {
    format!("gitgate={level}")
}

/// Initialize the logging system.
///
/// `RUST_LOG` overrides `level` when set. Nothing is installed for
/// [`LogSink::Disabled`].
///
/// ```rust,no_run
/// use gitgate_shell::{init_logging, LogFormat, LogSink};
/// use std::path::Path;
///
/// init_logging("info", LogFormat::Json, LogSink::File(Path::new("/var/log/gitgate.log"))).unwrap();
/// ```
pub fn init_logging(level: &str, format: LogFormat, sink: LogSink<'_>) -> io::Result<()> {
    let (writer, ansi) = match sink {
        LogSink::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        LogSink::Stderr => (BoxMakeWriter::new(io::stderr), io::stderr().is_terminal()),
        LogSink::Disabled => return Ok(()),
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true)
                    .with_writer(writer),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_ansi(ansi).with_writer(writer))
            .init(),
    }

    tracing::debug!(level = %level, ?format, ?sink, "logging initialized");
    Ok(())
}
