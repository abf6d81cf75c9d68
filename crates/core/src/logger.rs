// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide tagged log stream.
//!
//! [`Logger`] is a cheap clone handle over an unbounded record channel;
//! [`LogDrain`] is the single owner of the output writer. Records are
//! filtered against per-program thresholds on the sending side and
//! masked/formatted on the drain side, so one record is never interleaved
//! with another at the byte level — serialization falls out of single
//! ownership, not locking.

use crate::format::LogFormat;
use crate::level::LogLevel;
use crate::record::LogRecord;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Replacement text for masked secrets.
const MASK: &str = "******";

/// State shared between all logger handles and the drain.
struct Shared {
    /// Per-program display thresholds; programs not present use `default`.
    levels: RwLock<HashMap<String, LogLevel>>,
    default_level: RwLock<LogLevel>,
    /// Secret values to be replaced with [`MASK`] in every message.
    secrets: RwLock<Vec<String>>,
    format: RwLock<LogFormat>,
}

/// Sending half of the log stream. Clone freely.
#[derive(Clone)]
pub struct Logger {
    tx: mpsc::UnboundedSender<LogRecord>,
    shared: Arc<Shared>,
}

/// Receiving half: owns the writer, applies masking and formatting.
pub struct LogDrain<W: Write> {
    rx: mpsc::UnboundedReceiver<LogRecord>,
    writer: W,
    shared: Arc<Shared>,
}

impl Logger {
    /// Create a logger draining to the given writer (stdout in production,
    /// a buffer in tests).
    pub fn new<W: Write>(writer: W) -> (Logger, LogDrain<W>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            levels: RwLock::new(HashMap::new()),
            default_level: RwLock::new(LogLevel::Info),
            secrets: RwLock::new(Vec::new()),
            format: RwLock::new(LogFormat::default()),
        });
        (
            Logger {
                tx,
                shared: Arc::clone(&shared),
            },
            LogDrain { rx, writer, shared },
        )
    }

    /// Emit a record if it passes the program's threshold.
    ///
    /// Returns whether the record was accepted. Send failures (drain gone
    /// during teardown) are reported as `false` rather than panicking.
    pub fn log(&self, record: LogRecord) -> bool {
        if record.level < self.threshold(&record.program) {
            return false;
        }
        self.tx.send(record).is_ok()
    }

    /// Emit a message at an explicit level.
    pub fn emit(&self, program: &str, level: LogLevel, message: impl Into<String>) -> bool {
        self.log(LogRecord::new(program, level, message))
    }

    pub fn debug(&self, program: &str, message: impl Into<String>) -> bool {
        self.emit(program, LogLevel::Debug, message)
    }

    pub fn info(&self, program: &str, message: impl Into<String>) -> bool {
        self.emit(program, LogLevel::Info, message)
    }

    pub fn warning(&self, program: &str, message: impl Into<String>) -> bool {
        self.emit(program, LogLevel::Warning, message)
    }

    pub fn error(&self, program: &str, message: impl Into<String>) -> bool {
        self.emit(program, LogLevel::Error, message)
    }

    pub fn critical(&self, program: &str, message: impl Into<String>) -> bool {
        self.emit(program, LogLevel::Critical, message)
    }

    fn threshold(&self, program: &str) -> LogLevel {
        self.shared
            .levels
            .read()
            .get(program)
            .copied()
            .unwrap_or(*self.shared.default_level.read())
    }

    /// Set the display threshold for one program.
    pub fn set_level(&self, program: impl Into<String>, level: LogLevel) {
        self.shared.levels.write().insert(program.into(), level);
    }

    /// Set the threshold used for programs without an explicit level.
    pub fn set_default_level(&self, level: LogLevel) {
        *self.shared.default_level.write() = level;
    }

    /// Replace the record template. Takes effect for records not yet
    /// drained, which is what the `update_config` hook needs.
    pub fn set_format(&self, format: LogFormat) {
        *self.shared.format.write() = format;
    }

    /// Register a secret value to be masked in every drained message.
    /// Empty values are ignored (they would match everywhere).
    pub fn add_secret(&self, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.shared.secrets.write().push(value);
        }
    }

    /// Number of registered secrets, for extension diagnostics.
    pub fn secret_count(&self) -> usize {
        self.shared.secrets.read().len()
    }
}

impl<W: Write> LogDrain<W> {
    /// Drain records until every `Logger` clone is dropped, then flush.
    ///
    /// Write errors terminate the drain; the supervisor treats that as a
    /// fatal logger failure.
    pub async fn run(mut self) -> std::io::Result<()> {
        while let Some(record) = self.rx.recv().await {
            self.write_record(&record)?;
        }
        self.writer.flush()
    }

    fn write_record(&mut self, record: &LogRecord) -> std::io::Result<()> {
        let mut masked = record.clone();
        {
            let secrets = self.shared.secrets.read();
            for secret in secrets.iter() {
                if masked.message.contains(secret.as_str()) {
                    masked.message = masked.message.replace(secret.as_str(), MASK);
                }
            }
        }
        let line = self.shared.format.read().render(&masked);
        writeln!(self.writer, "{line}")?;
        self.writer.flush()
    }
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
