// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the supervision engine.

use thiserror::Error;

/// Failures between "spawn requested" and "exec succeeded".
///
/// These never panic a runner; they become a `Failed(reason)` transition
/// proposal so the supervisor can account for the program without it ever
/// having run.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("unknown user `{0}`")]
    UnknownUser(String),

    #[error("unknown group `{0}`")]
    UnknownGroup(String),

    #[error("user/group lookup failed: {0}")]
    Lookup(#[source] nix::Error),

    #[error("program has no command (and no CLI override)")]
    NoCommand,

    #[error("invalid command: {0}")]
    BadCommand(String),

    #[error("spawn failed: {0}")]
    Spawn(#[source] std::io::Error),
}
