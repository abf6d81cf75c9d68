// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log pumps: one child stream in, tagged records out.
//!
//! A pump reads raw bytes from one end of a child's stdout or stderr pipe
//! and emits one [`LogRecord`] per logical line. Non-UTF-8 input is
//! decoded with replacement; nothing is dropped. A line longer than the
//! cap is split at the cap, each chunk becoming its own record.

use encab_core::{LogLevel, LogRecord, Logger};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Cap on a single record's message, in bytes.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

const READ_CHUNK: usize = 8 * 1024;

/// How a pump ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// Writer closed; all buffered bytes were flushed.
    Eof,
    /// A read failed. The child may still be running; output from this
    /// stream is lost from here on.
    ReadError,
}

/// Pump one stream until EOF or a read error.
///
/// A write that arrives without a trailing newline stays buffered until
/// more data completes the line or the stream closes, at which point the
/// tail is emitted as a final record.
pub async fn pump<R>(
    mut reader: R,
    program: &str,
    level: LogLevel,
    logger: &Logger,
    max_line: usize,
) -> PumpOutcome
where
    R: AsyncRead + Unpin,
{
    let mut buffer: Vec<u8> = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => {
                if !buffer.is_empty() {
                    emit(logger, program, level, &buffer);
                }
                return PumpOutcome::Eof;
            }
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                drain_lines(logger, program, level, &mut buffer, max_line);
            }
            Err(e) => {
                tracing::warn!(program, error = %e, "log pump read error");
                logger.error(program, format!("log stream read error: {e}"));
                return PumpOutcome::ReadError;
            }
        }
    }
}

/// Emit every complete line in the buffer, splitting overlong ones.
fn drain_lines(
    logger: &Logger,
    program: &str,
    level: LogLevel,
    buffer: &mut Vec<u8>,
    max_line: usize,
) {
    loop {
        if let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            if pos <= max_line {
                emit(logger, program, level, &buffer[..pos]);
                buffer.drain(..=pos);
                continue;
            }
        } else if buffer.len() < max_line {
            return;
        }
        // No newline within the cap: emit a full-cap chunk and keep going.
        emit(logger, program, level, &buffer[..max_line]);
        buffer.drain(..max_line);
    }
}

fn emit(logger: &Logger, program: &str, level: LogLevel, bytes: &[u8]) {
    let message = String::from_utf8_lossy(bytes).into_owned();
    logger.log(LogRecord::new(program, level, message));
}

#[cfg(test)]
#[path = "pump_tests.rs"]
mod tests;
