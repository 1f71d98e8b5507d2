#![forbid(unsafe_code)]

//! Tracing output routed to the browser console.
//!
//! [`ConsoleMakeWriter`] hands the `fmt` layer one [`ConsoleLineWriter`] per
//! event. The writer is line-buffered so that a console call never receives
//! a torn line, and it remembers the event level so that warnings land in
//! `console.warn` and errors in `console.error`.
//!
//! The console itself sits behind [`ConsoleSink`]; the wasm build plugs in
//! the real console and native tests plug in a recorder.

use std::io::{self, Write};

use tracing::{Level, Metadata};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;

/// Every line is prefixed with this tag.
pub const LOG_PREFIX: &str = "[feedfollow]";

/// Destination for finished log lines.
pub trait ConsoleSink: Clone + Send + Sync + 'static {
    fn emit(&self, level: Level, line: &str);
}

/// `MakeWriter` over a [`ConsoleSink`].
#[derive(Debug, Clone)]
pub struct ConsoleMakeWriter<S> {
    sink: S,
}

impl<S: ConsoleSink> ConsoleMakeWriter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

impl<'a, S: ConsoleSink> MakeWriter<'a> for ConsoleMakeWriter<S> {
    type Writer = ConsoleLineWriter<S>;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleLineWriter::new(self.sink.clone(), Level::INFO)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleLineWriter::new(self.sink.clone(), *meta.level())
    }
}

/// Line-buffered writer for one event.
///
/// Complete lines go to the sink as they arrive; a trailing partial line is
/// sent on `flush()` or drop.
#[derive(Debug)]
pub struct ConsoleLineWriter<S: ConsoleSink> {
    sink: S,
    level: Level,
    buffer: Vec<u8>,
}

impl<S: ConsoleSink> ConsoleLineWriter<S> {
    fn new(sink: S, level: Level) -> Self {
        Self {
            sink,
            level,
            buffer: Vec::with_capacity(128),
        }
    }

    fn emit_buffer(&mut self) {
        let line = String::from_utf8_lossy(&self.buffer);
        let line = line.trim_end_matches('\r');
        if !line.is_empty() {
            self.sink.emit(self.level, &format!("{LOG_PREFIX} {line}"));
        }
        self.buffer.clear();
    }
}

impl<S: ConsoleSink> Write for ConsoleLineWriter<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            if byte == b'\n' {
                self.emit_buffer();
            } else {
                self.buffer.push(byte);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            self.emit_buffer();
        }
        Ok(())
    }
}

impl<S: ConsoleSink> Drop for ConsoleLineWriter<S> {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            self.emit_buffer();
        }
    }
}

/// Level filter for `directive` (`"info"`, `"feedfollow.locate=debug"`, ...).
/// An unparsable directive falls back to `info`.
#[must_use]
pub fn filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Subscriber writing plain lines (no timestamps, no ANSI) to `sink`.
pub fn subscriber<S: ConsoleSink>(
    sink: S,
    directive: &str,
) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry().with(filter(directive)).with(
        tracing_subscriber::fmt::layer()
            .without_time()
            .with_ansi(false)
            .with_target(true)
            .with_writer(ConsoleMakeWriter::new(sink)),
    )
}
