// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! encab-engine: the leaves of the supervision tree.
//!
//! One [`runner`] task per program owns the child process and its two
//! [`pump`] tasks; the [`reaper`] collects orphaned descendants when the
//! supervisor is PID 1; [`env`] composes each child's effective
//! environment. Runners never mutate supervisor state — they propose
//! transitions over the event channel and obey stop requests from their
//! handle.

pub mod env;
pub mod error;
pub mod pump;
pub mod reaper;
pub mod runner;
pub mod subprocess;

pub use env::{effective_environment, ExtensionEnv};
pub use error::SpawnError;
pub use pump::{pump, PumpOutcome, MAX_LINE_BYTES};
pub use reaper::{spawn_reaper, OwnedPids};
pub use runner::{spawn_program, ProgramHandle, RunnerContext, StopRequest};
pub use subprocess::run_with_timeout;
