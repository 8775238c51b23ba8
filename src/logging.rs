//! Console and transcript logging.
//!
//! Every run writes a `deploy_YYYYMMDD_HHMMSS.log` transcript next to
//! the console output. Both sinks pass through a redacting writer so
//! registered secrets never reach a terminal or a file.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock, RwLock};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::error::{DeployError, DeployResult};

/// Prefix of every transcript file name.
pub const LOG_PREFIX: &str = "deploy";

const MASK: &str = "****";

/// Set of strings scrubbed from all log output.
#[derive(Debug, Clone, Default)]
pub struct Secrets(Arc<RwLock<Vec<String>>>);

impl Secrets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value to scrub. Blank values are ignored.
    pub fn register(&self, secret: &str) {
        let secret = secret.trim();
        if secret.is_empty() {
            return;
        }
        if let Ok(mut list) = self.0.write() {
            if !list.iter().any(|s| s == secret) {
                list.push(secret.to_string());
                // Longest first so a secret containing another is
                // masked whole.
                list.sort_by_key(|s| std::cmp::Reverse(s.len()));
            }
        }
    }

    /// Replace every registered secret in `text` with a mask.
    #[must_use]
    pub fn scrub(&self, text: &str) -> String {
        let Ok(list) = self.0.read() else {
            return text.to_string();
        };
        list.iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), MASK))
    }
}

/// Process-wide secret set used by the log writers.
pub fn secrets() -> &'static Secrets {
    static SECRETS: OnceLock<Secrets> = OnceLock::new();
    SECRETS.get_or_init(Secrets::new)
}

/// `MakeWriter` wrapper scrubbing secrets from every write.
pub struct Redacting<M> {
    inner: M,
    secrets: Secrets,
}

impl<M> Redacting<M> {
    pub const fn new(inner: M, secrets: Secrets) -> Self {
        Self { inner, secrets }
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for Redacting<M> {
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: self.inner.make_writer(),
            secrets: self.secrets.clone(),
        }
    }
}

pub struct RedactingWriter<W> {
    inner: W,
    secrets: Secrets,
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.inner.write_all(self.secrets.scrub(&text).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Logging options taken from the command line.
#[derive(Debug, Clone)]
pub struct LogOptions {
    pub dir: PathBuf,
    pub verbose: bool,
}

/// Transcript file name for a run started now, down to the second.
#[must_use]
pub fn log_file_name() -> String {
    format!(
        "{LOG_PREFIX}_{}.log",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Install the console and transcript subscribers. The returned
/// guard flushes the transcript when dropped; keep it alive for the
/// whole run.
pub fn init(options: &LogOptions) -> DeployResult<(WorkerGuard, PathBuf)> {
    std::fs::create_dir_all(&options.dir)?;
    let file_name = log_file_name();
    let path = options.dir.join(&file_name);

    let appender = tracing_appender::rolling::never(&options.dir, &file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let console_filter = if options.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,dockhand::cmd=warn"))
    };

    let console = fmt::layer()
        .with_target(false)
        .with_writer(Redacting::new(io::stderr, secrets().clone()))
        .with_filter(console_filter);

    let file = fmt::layer()
        .with_ansi(false)
        .with_writer(Redacting::new(file_writer, secrets().clone()))
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| DeployError::Other(format!("logging init failed: {e}")))?;

    Ok((guard, path))
}
