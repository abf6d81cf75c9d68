// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal router: external signals become supervisor mailbox events.
//!
//! SIGINT, SIGTERM, and SIGHUP all request orderly shutdown; a second
//! occurrence of any of them escalates to immediate kill-all. SIGPIPE is
//! consumed and discarded (registering the stream replaces the default
//! terminate-on-SIGPIPE disposition). SIGCHLD is not routed here — the
//! runtime's child waits and the reaper subscribe to it themselves.
//!
//! No work happens on signal delivery beyond posting an event.

use encab_core::{ShutdownKind, SupervisorEvent};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Install the router. The returned task runs until the supervisor drops
/// its mailbox receiver (sends start failing) or the task is aborted.
pub fn install(events: mpsc::Sender<SupervisorEvent>) -> std::io::Result<JoinHandle<()>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigpipe = signal(SignalKind::pipe())?;

    Ok(tokio::spawn(async move {
        let mut requested = false;
        loop {
            let name = tokio::select! {
                _ = sigint.recv() => "SIGINT",
                _ = sigterm.recv() => "SIGTERM",
                _ = sighup.recv() => "SIGHUP",
                _ = sigpipe.recv() => {
                    tracing::debug!("ignoring SIGPIPE");
                    continue;
                }
            };
            let kind = if requested {
                ShutdownKind::Immediate
            } else {
                ShutdownKind::Graceful
            };
            requested = true;
            tracing::debug!(signal = name, ?kind, "shutdown signal");
            if events
                .send(SupervisorEvent::Shutdown { kind })
                .await
                .is_err()
            {
                break;
            }
        }
    }))
}
