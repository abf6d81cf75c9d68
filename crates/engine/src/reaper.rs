// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orphan reaping for PID-1 operation.
//!
//! When encab is PID 1 the kernel reparents orphaned descendants to it.
//! The reaper wakes on SIGCHLD, *peeks* at reapable children with
//! `waitid(..., WNOWAIT)`, and claims only pids no runner owns — a
//! runner's own child is left for the runner's `wait`, so tracked exit
//! statuses are never consumed here. Orphan reaps are logged at DEBUG.

use encab_core::{Logger, SUPERVISOR_PROGRAM};
use nix::sys::wait::{waitid, waitpid, Id, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Fallback poll interval: an owned zombie at the head of the queue can
/// hide an orphan behind it until the runner claims its child, so the
/// reaper re-checks periodically as well as on SIGCHLD.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Pids currently owned by child runners. Written only by runners; the
/// reaper never claims a pid present here.
#[derive(Clone, Default)]
pub struct OwnedPids(Arc<Mutex<HashSet<u32>>>);

impl OwnedPids {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, pid: u32) {
        self.0.lock().insert(pid);
    }

    pub fn remove(&self, pid: u32) {
        self.0.lock().remove(&pid);
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.0.lock().contains(&pid)
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

/// Spawn the reaper task. It runs until `shutdown` fires, which the
/// supervisor does in final teardown.
pub fn spawn_reaper(
    owned: OwnedPids,
    logger: Logger,
    shutdown: oneshot::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(run(owned, logger, shutdown))
}

async fn run(owned: OwnedPids, logger: Logger, mut shutdown: oneshot::Receiver<()>) {
    let mut sigchld = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::child()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "reaper could not subscribe to SIGCHLD");
            return;
        }
    };
    let mut poll = tokio::time::interval(POLL_INTERVAL);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tracing::debug!("reaper started");
    loop {
        tokio::select! {
            _ = sigchld.recv() => reap_orphans(&owned, &logger),
            _ = poll.tick() => reap_orphans(&owned, &logger),
            _ = &mut shutdown => break,
        }
    }
    // Final sweep so nothing is left behind at teardown.
    reap_orphans(&owned, &logger);
    tracing::debug!("reaper stopped");
}

/// Claim every reapable pid not owned by a runner.
fn reap_orphans(owned: &OwnedPids, logger: &Logger) {
    loop {
        let flags = WaitPidFlag::WEXITED | WaitPidFlag::WNOHANG | WaitPidFlag::WNOWAIT;
        let peeked = match waitid(Id::All, flags) {
            Ok(status) => status,
            // No children at all is the steady state for a supervisor
            // whose programs have not spawned descendants.
            Err(nix::errno::Errno::ECHILD) => return,
            Err(e) => {
                tracing::warn!(error = %e, "waitid failed");
                return;
            }
        };
        let pid = match peeked.pid() {
            Some(pid) => pid,
            // StillAlive: children exist but none are reapable.
            None => return,
        };
        if owned.contains(pid.as_raw() as u32) {
            // Leave it for its runner; re-checked on the next wake.
            return;
        }
        claim(pid, logger);
    }
}

fn claim(pid: Pid, logger: &Logger) {
    match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::Exited(pid, code)) => {
            logger.debug(
                SUPERVISOR_PROGRAM,
                format!("reaped orphan pid {pid} (exit code {code})"),
            );
        }
        Ok(WaitStatus::Signaled(pid, signal, _)) => {
            logger.debug(
                SUPERVISOR_PROGRAM,
                format!("reaped orphan pid {pid} (signal {signal})"),
            );
        }
        Ok(other) => {
            tracing::debug!(?other, "unexpected wait status while claiming orphan");
        }
        Err(e) => {
            tracing::debug!(%pid, error = %e, "orphan vanished before claim");
        }
    }
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
