// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! encab-core: data model shared by the encab supervisor crates.
//!
//! Holds the pieces every other crate speaks in: log levels and records,
//! the process-wide [`Logger`] handle, the per-program lifecycle state
//! machine, and the supervisor mailbox events.

pub mod event;
pub mod format;
pub mod level;
pub mod logger;
pub mod program;
pub mod record;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use event::{ShutdownKind, StreamKind, SupervisorEvent};
pub use format::LogFormat;
pub use level::LogLevel;
pub use logger::{LogDrain, Logger};
pub use program::{ProgramState, RuntimeRecord, TransitionError};
pub use record::LogRecord;

/// The reserved name of the primary program.
///
/// The program named `main` bounds the supervisor's lifetime: helpers start
/// before it and are stopped after it exits.
pub const MAIN_PROGRAM: &str = "main";

/// Program name the supervisor logs its own lifecycle messages under.
pub const SUPERVISOR_PROGRAM: &str = "encab";
