// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-program lifecycle state machine.
//!
//! Runners *propose* transitions as events; only the supervisor applies
//! them, through [`RuntimeRecord::apply`], which rejects anything the
//! transition table does not admit. This keeps every observed state
//! sequence a valid path even when events race.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use thiserror::Error;

/// Lifecycle state of one supervised program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProgramState {
    /// Configured but not yet spawned.
    Init,
    /// Spawn initiated, exec not yet acknowledged.
    Starting,
    /// Process executing, no termination requested.
    Running,
    /// Supervisor asked the runner to stop; exit is expected.
    Stopping,
    /// Process exited with a code.
    Exited { code: i32 },
    /// Process was terminated by a signal.
    Crashed { signal: i32 },
    /// Spawn failed before the process ever ran.
    Failed { reason: String },
}

/// Error produced when a proposed transition is not in the table.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid transition for {program}: {from} -> {to}")]
pub struct TransitionError {
    pub program: String,
    pub from: String,
    pub to: String,
}

impl ProgramState {
    /// Short lower-case tag used in log lines.
    pub fn tag(&self) -> &'static str {
        match self {
            ProgramState::Init => "init",
            ProgramState::Starting => "starting",
            ProgramState::Running => "running",
            ProgramState::Stopping => "stopping",
            ProgramState::Exited { .. } => "exited",
            ProgramState::Crashed { .. } => "crashed",
            ProgramState::Failed { .. } => "failed",
        }
    }

    /// Terminal states for shutdown accounting.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgramState::Exited { .. } | ProgramState::Crashed { .. } | ProgramState::Failed { .. }
        )
    }

    /// Whether the transition `self -> next` is admitted.
    ///
    /// The restart edge (terminal -> `Starting`) exists for helpers with a
    /// restart delay; the supervisor is responsible for never taking it for
    /// `main` or during shutdown.
    pub fn admits(&self, next: &ProgramState) -> bool {
        use ProgramState::*;
        match (self, next) {
            (Init, Starting) => true,
            (Starting, Running) => true,
            (Starting, Failed { .. }) => true,
            (Running, Exited { .. }) => true,
            (Running, Crashed { .. }) => true,
            (Running, Stopping) => true,
            (Stopping, Exited { .. }) => true,
            (Stopping, Crashed { .. }) => true,
            (Exited { .. } | Crashed { .. } | Failed { .. }, Starting) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramState::Exited { code } => write!(f, "exited({code})"),
            ProgramState::Crashed { signal } => write!(f, "crashed(signal {signal})"),
            ProgramState::Failed { reason } => write!(f, "failed: {reason}"),
            other => f.write_str(other.tag()),
        }
    }
}

/// Mutable runtime bookkeeping for one program, owned by the supervisor.
#[derive(Debug, Clone)]
pub struct RuntimeRecord {
    pub state: ProgramState,
    /// OS process id while `Running`/`Stopping`.
    pub pid: Option<u32>,
    /// When the current incarnation was spawned.
    pub spawned_at: Option<Instant>,
    /// Number of restarts performed so far.
    pub restarts: u32,
}

impl RuntimeRecord {
    pub fn new() -> Self {
        Self {
            state: ProgramState::Init,
            pid: None,
            spawned_at: None,
            restarts: 0,
        }
    }

    /// Apply a proposed transition, rejecting anything the table does not
    /// admit. On success the pid/spawn bookkeeping is kept consistent with
    /// the new state.
    pub fn apply(&mut self, program: &str, next: ProgramState) -> Result<(), TransitionError> {
        if !self.state.admits(&next) {
            return Err(TransitionError {
                program: program.to_string(),
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        match &next {
            ProgramState::Starting => {
                if self.state.is_terminal() {
                    self.restarts += 1;
                }
                self.pid = None;
                self.spawned_at = Some(Instant::now());
            }
            ProgramState::Exited { .. } | ProgramState::Crashed { .. } | ProgramState::Failed { .. } => {
                self.pid = None;
            }
            _ => {}
        }
        self.state = next;
        Ok(())
    }

    /// Record the pid once the runner acknowledges the spawn.
    pub fn set_pid(&mut self, pid: u32) {
        self.pid = Some(pid);
    }
}

impl Default for RuntimeRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "program_tests.rs"]
mod tests;
