// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::logger::{LogDrain, Logger};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// In-memory writer the test can read back after the drain finishes.
#[derive(Clone, Default)]
pub struct CaptureBuffer(Arc<Mutex<Vec<u8>>>);

impl CaptureBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Logger wired to a capture buffer.
pub fn capture_logger() -> (Logger, LogDrain<CaptureBuffer>, CaptureBuffer) {
    let buffer = CaptureBuffer::default();
    let (logger, drain) = Logger::new(buffer.clone());
    (logger, drain, buffer)
}
