// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tagged log records carried on the logger channel.

use crate::level::LogLevel;
use chrono::{DateTime, Utc};
use std::time::Instant;

/// One logical log line, tagged with its originating program and severity.
///
/// The message never contains the terminating newline; multi-line child
/// output becomes multiple records. Records carry both a wall-clock
/// timestamp (for formatting) and a monotonic stamp (for ordering checks
/// that must not be disturbed by clock adjustments).
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub monotonic: Instant,
    pub program: String,
    pub level: LogLevel,
    pub message: String,
}

impl LogRecord {
    /// Create a record stamped with the current time.
    pub fn new(program: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            monotonic: Instant::now(),
            program: program.into(),
            level,
            message: message.into(),
        }
    }
}
