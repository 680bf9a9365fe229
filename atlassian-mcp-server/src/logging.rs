//! Logging setup: stderr plus an optional file sink, both redacted

use anyhow::{Context, Result};
use atlassian_mcp_shared::{LogRedactor, LoggingConfig};
use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Escape line breaks inside a record so one event stays one line.
/// The terminating newline of the record is kept.
fn escape_line_breaks(record: &str) -> Cow<'_, str> {
    let (body, terminator) = match record.strip_suffix('\n') {
        Some(body) => (body, "\n"),
        None => (record, ""),
    };
    if !body.contains(['\n', '\r']) {
        return Cow::Borrowed(record);
    }
    Cow::Owned(format!(
        "{}{terminator}",
        body.replace('\r', "\\r").replace('\n', "\\n")
    ))
}

/// Writer that masks sensitive data in each formatted record
pub struct RedactingWriter<W> {
    inner: W,
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let single_line = escape_line_breaks(&text);
        let redacted = LogRedactor::global().redact(&single_line);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub struct RedactingMakeWriter<M> {
    inner: M,
}

impl<M> RedactingMakeWriter<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for RedactingMakeWriter<M> {
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: self.inner.make_writer(),
        }
    }
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Layer appending to the configured log file, if any
pub fn file_layer(config: &LoggingConfig) -> Result<Option<BoxedLayer>> {
    let Some(path) = &config.log_file else {
        return Ok(None);
    };

    let writer = RedactingMakeWriter::new(Mutex::new(open_log_file(path)?));
    let layer = fmt::layer().with_ansi(false).with_writer(writer);

    Ok(Some(if config.json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }))
}

fn stderr_layer() -> BoxedLayer {
    fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(RedactingMakeWriter::new(io::stderr))
        .boxed()
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter()));

    let mut layers = vec![stderr_layer()];
    if let Some(layer) = file_layer(config)? {
        layers.push(layer);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Failed to set global logging subscriber")?;

    Ok(())
}
