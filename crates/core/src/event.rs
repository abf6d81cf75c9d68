// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messages posted into the supervisor mailbox.
//!
//! Runners, the signal router, and extension tasks never touch supervisor
//! state directly; everything arrives here and is applied on the
//! supervisor task.

use crate::program::ProgramState;
use serde::{Deserialize, Serialize};

/// Which child stream a pump was attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

/// How urgently the supervisor should shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownKind {
    /// First signal: orderly reverse-order stop with graceful waits.
    Graceful,
    /// Second signal: cancel graceful waits, kill everything now.
    Immediate,
}

/// Events that drive the supervisor loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SupervisorEvent {
    /// A runner proposes a lifecycle transition for its program.
    #[serde(rename = "program:state")]
    State {
        program: String,
        state: ProgramState,
    },

    /// A runner observed its child's pid after a successful spawn.
    #[serde(rename = "program:pid")]
    Pid { program: String, pid: u32 },

    /// A pump terminated before its child exited; output may be lost but
    /// the child itself is unaffected.
    #[serde(rename = "program:log_loss")]
    LogLoss {
        program: String,
        stream: StreamKind,
    },

    /// A helper's restart delay elapsed; the supervisor may respawn it.
    #[serde(rename = "program:restart_due")]
    RestartDue { program: String },

    /// The signal router requests shutdown.
    #[serde(rename = "supervisor:shutdown")]
    Shutdown { kind: ShutdownKind },
}
