// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child runner: one task per supervised program.
//!
//! The runner owns the child process and its two pumps. It never touches
//! supervisor state — lifecycle transitions are *proposed* over the event
//! channel and applied (or rejected) on the supervisor task. The handle
//! returned from [`spawn_program`] is the only way to stop a running
//! child.
//!
//! Stop protocol: SIGTERM, wait up to `join_time`, then SIGKILL and wait
//! unbounded. A `Kill` request (shutdown escalation) skips the graceful
//! step. After the child exits, both pumps get up to `join_time` to drain
//! before the exit line is emitted and the terminal state proposed.

use crate::error::SpawnError;
use crate::pump::{pump, PumpOutcome, MAX_LINE_BYTES};
use crate::reaper::OwnedPids;
use encab_core::{LogLevel, Logger, ProgramState, StreamKind, SupervisorEvent};
use encab_config::{GroupRef, ProgramConfig, UserRef};
use indexmap::IndexMap;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Stop request delivered through a [`ProgramHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopRequest {
    /// SIGTERM, bounded wait, then SIGKILL.
    Graceful,
    /// SIGKILL immediately (second-signal escalation).
    Kill,
}

/// Everything a runner needs, resolved by the supervisor up front.
pub struct RunnerContext {
    pub name: String,
    /// Normalized program config (defaults applied).
    pub config: ProgramConfig,
    /// Effective environment from the environment builder.
    pub environment: IndexMap<String, String>,
    /// CLI argv override; only ever set for `main`.
    pub argv_override: Option<Vec<String>>,
    pub logger: Logger,
    pub events: mpsc::Sender<SupervisorEvent>,
    pub owned_pids: OwnedPids,
}

/// Supervisor-side handle to a running program task.
pub struct ProgramHandle {
    name: String,
    stop_tx: mpsc::Sender<StopRequest>,
    task: JoinHandle<()>,
}

impl ProgramHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request the stop protocol. Non-blocking and idempotent: the
    /// channel holds one graceful and one kill request; anything beyond
    /// that is already covered by what is queued.
    pub fn stop(&self) {
        let _ = self.stop_tx.try_send(StopRequest::Graceful);
    }

    /// Escalate: SIGKILL without the graceful wait.
    pub fn kill(&self) {
        let _ = self.stop_tx.try_send(StopRequest::Kill);
    }

    /// Wait for the runner task to finish (child exited, pumps drained).
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::warn!(program = %self.name, error = %e, "runner task panicked");
        }
    }
}

/// Spawn the runner task for one program.
pub fn spawn_program(ctx: RunnerContext) -> ProgramHandle {
    let (stop_tx, stop_rx) = mpsc::channel(2);
    let name = ctx.name.clone();
    let task = tokio::spawn(run(ctx, stop_rx));
    ProgramHandle {
        name,
        stop_tx,
        task,
    }
}

async fn run(ctx: RunnerContext, mut stop_rx: mpsc::Receiver<StopRequest>) {
    if ctx.config.startup_delay > 0.0 {
        let delay = Duration::from_secs_f64(ctx.config.startup_delay);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = stop_rx.recv() => {
                tracing::debug!(program = %ctx.name, "stopped before spawn");
                return;
            }
        }
    }

    propose(&ctx, ProgramState::Starting).await;

    let mut child = match spawn_child(&ctx) {
        Ok(child) => child,
        Err(e) => {
            ctx.logger.error(&ctx.name, format!("spawn failed: {e}"));
            propose(
                &ctx,
                ProgramState::Failed {
                    reason: e.to_string(),
                },
            )
            .await;
            return;
        }
    };

    let pid = child.id();
    if let Some(pid) = pid {
        ctx.owned_pids.add(pid);
        let _ = ctx
            .events
            .send(SupervisorEvent::Pid {
                program: ctx.name.clone(),
                pid,
            })
            .await;
    }
    // Alive with pipes open counts as the exec ack.
    propose(&ctx, ProgramState::Running).await;

    let join_time = Duration::from_secs_f64(ctx.config.join_time.unwrap_or(1.0));
    let stdout_level = ctx.config.loglevel.unwrap_or_default();
    let stdout_pump = child.stdout.take().map(|stream| {
        spawn_pump(stream, ctx.name.clone(), stdout_level, ctx.logger.clone())
    });
    // stderr is always ERROR; the configured level governs stdout only.
    let stderr_pump = child.stderr.take().map(|stream| {
        spawn_pump(stream, ctx.name.clone(), LogLevel::Error, ctx.logger.clone())
    });

    let (status, stopping) = supervise_child(&ctx, &mut child, &mut stop_rx, join_time).await;

    if let Some(pid) = pid {
        ctx.owned_pids.remove(pid);
    }

    drain_pump(&ctx, StreamKind::Stdout, stdout_pump, join_time).await;
    drain_pump(&ctx, StreamKind::Stderr, stderr_pump, join_time).await;

    let state = match status {
        Ok(status) => exit_state(status),
        Err(e) => {
            // wait(2) failing is treated as an opaque non-zero exit.
            tracing::error!(program = %ctx.name, error = %e, "wait for child failed");
            ProgramState::Exited { code: 1 }
        }
    };
    match &state {
        ProgramState::Exited { code: 0 } => {
            ctx.logger.info(&ctx.name, "Exited with rc: 0");
        }
        ProgramState::Exited { code } => {
            ctx.logger.error(&ctx.name, format!("Exited with rc: {code}"));
        }
        ProgramState::Crashed { signal } if stopping => {
            ctx.logger
                .info(&ctx.name, format!("Terminated by signal {signal}"));
        }
        ProgramState::Crashed { signal } => {
            ctx.logger
                .error(&ctx.name, format!("Terminated by signal {signal}"));
        }
        _ => {}
    }
    propose(&ctx, state).await;
}

/// Wait for exit while honoring stop requests and the escalation timer.
async fn supervise_child(
    ctx: &RunnerContext,
    child: &mut Child,
    stop_rx: &mut mpsc::Receiver<StopRequest>,
    join_time: Duration,
) -> (std::io::Result<ExitStatus>, bool) {
    let mut stopping = false;
    let mut sigterm_sent = false;
    let mut killed = false;
    let kill_timer = tokio::time::sleep(Duration::ZERO);
    tokio::pin!(kill_timer);
    let mut timer_armed = false;

    loop {
        tokio::select! {
            status = child.wait() => return (status, stopping),
            _ = kill_timer.as_mut(), if timer_armed => {
                timer_armed = false;
                if !killed {
                    ctx.logger.warning(
                        &ctx.name,
                        format!(
                            "no exit within {:.1}s of SIGTERM, sending SIGKILL",
                            join_time.as_secs_f64()
                        ),
                    );
                    signal_child(&ctx.name, child, Signal::SIGKILL);
                    killed = true;
                }
            }
            Some(request) = stop_rx.recv() => {
                if !stopping {
                    propose(ctx, ProgramState::Stopping).await;
                    stopping = true;
                }
                match request {
                    StopRequest::Graceful => {
                        if !sigterm_sent && !killed {
                            signal_child(&ctx.name, child, Signal::SIGTERM);
                            sigterm_sent = true;
                            kill_timer.as_mut().reset(tokio::time::Instant::now() + join_time);
                            timer_armed = true;
                        }
                    }
                    StopRequest::Kill => {
                        if !killed {
                            signal_child(&ctx.name, child, Signal::SIGKILL);
                            killed = true;
                            timer_armed = false;
                        }
                    }
                }
            }
        }
    }
}

fn signal_child(name: &str, child: &Child, signal: Signal) {
    let Some(pid) = child.id() else {
        return;
    };
    tracing::debug!(program = name, %pid, %signal, "signalling child");
    if let Err(e) = kill(Pid::from_raw(pid as i32), signal) {
        tracing::warn!(program = name, %pid, %signal, error = %e, "kill failed");
    }
}

fn spawn_pump<R>(
    stream: R,
    name: String,
    level: LogLevel,
    logger: Logger,
) -> JoinHandle<PumpOutcome>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move { pump(stream, &name, level, &logger, MAX_LINE_BYTES).await })
}

/// Give a pump `join_time` to drain, then abandon it.
async fn drain_pump(
    ctx: &RunnerContext,
    stream: StreamKind,
    handle: Option<JoinHandle<PumpOutcome>>,
    join_time: Duration,
) {
    let Some(mut handle) = handle else { return };
    match tokio::time::timeout(join_time, &mut handle).await {
        Ok(Ok(PumpOutcome::Eof)) => {}
        Ok(Ok(PumpOutcome::ReadError)) => {
            // Output was lost but the child itself is unaffected.
            let _ = ctx
                .events
                .send(SupervisorEvent::LogLoss {
                    program: ctx.name.clone(),
                    stream,
                })
                .await;
        }
        Ok(Err(e)) => {
            tracing::warn!(program = %ctx.name, stream = stream.as_str(), error = %e, "pump task failed");
        }
        Err(_) => {
            tracing::debug!(program = %ctx.name, stream = stream.as_str(), "pump did not drain in time");
            handle.abort();
        }
    }
}

async fn propose(ctx: &RunnerContext, state: ProgramState) {
    let _ = ctx
        .events
        .send(SupervisorEvent::State {
            program: ctx.name.clone(),
            state,
        })
        .await;
}

fn exit_state(status: ExitStatus) -> ProgramState {
    if let Some(signal) = status.signal() {
        ProgramState::Crashed { signal }
    } else {
        ProgramState::Exited {
            code: status.code().unwrap_or(1),
        }
    }
}

struct ResolvedIds {
    uid: Option<u32>,
    gid: Option<u32>,
}

/// Resolve configured user/group names to numeric ids.
fn resolve_ids(config: &ProgramConfig) -> Result<ResolvedIds, SpawnError> {
    let mut uid = None;
    let mut gid = None;
    match &config.user {
        Some(UserRef::Id(id)) => uid = Some(*id),
        Some(UserRef::Name(name)) => {
            let user = nix::unistd::User::from_name(name)
                .map_err(SpawnError::Lookup)?
                .ok_or_else(|| SpawnError::UnknownUser(name.clone()))?;
            uid = Some(user.uid.as_raw());
            // Primary group, unless an explicit group overrides below.
            gid = Some(user.gid.as_raw());
        }
        None => {}
    }
    match &config.group {
        Some(GroupRef::Id(id)) => gid = Some(*id),
        Some(GroupRef::Name(name)) => {
            let group = nix::unistd::Group::from_name(name)
                .map_err(SpawnError::Lookup)?
                .ok_or_else(|| SpawnError::UnknownGroup(name.clone()))?;
            gid = Some(group.gid.as_raw());
        }
        None => {}
    }
    Ok(ResolvedIds { uid, gid })
}

/// Argv to exec: CLI override (main only), then `command`, then `sh`.
fn build_argv(ctx: &RunnerContext) -> Result<(String, Vec<String>), SpawnError> {
    if let Some(argv) = &ctx.argv_override {
        if !argv.is_empty() {
            return Ok((argv[0].clone(), argv[1..].to_vec()));
        }
    }
    if let Some(command) = &ctx.config.command {
        let tokens = command
            .tokens()
            .map_err(|e| SpawnError::BadCommand(e.to_string()))?;
        let Some((program, args)) = tokens.split_first() else {
            return Err(SpawnError::NoCommand);
        };
        return Ok((program.clone(), args.to_vec()));
    }
    if let Some(sh) = &ctx.config.sh {
        // Several snippets become one script for a single child.
        let script = sh.as_slice().join("\n");
        return Ok(("/bin/sh".to_string(), vec!["-c".to_string(), script]));
    }
    Err(SpawnError::NoCommand)
}

// pre_exec runs between fork and exec; umask(2)/setgroups(2) have no safe
// wrapper there, hence the single unsafe exemption in this workspace.
#[allow(unsafe_code)]
fn spawn_child(ctx: &RunnerContext) -> Result<Child, SpawnError> {
    let (program, args) = build_argv(ctx)?;
    let ids = resolve_ids(&ctx.config)?;
    let umask = match &ctx.config.umask {
        Some(umask) => Some(
            umask
                .bits()
                .map_err(SpawnError::BadCommand)?,
        ),
        None => None,
    };

    let mut command = Command::new(&program);
    command
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env_clear()
        .envs(ctx.environment.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .kill_on_drop(true);
    if let Some(directory) = &ctx.config.directory {
        command.current_dir(directory);
    }
    if let Some(uid) = ids.uid {
        command.uid(uid);
    }
    if let Some(gid) = ids.gid {
        command.gid(gid);
    }
    if umask.is_some() || (ids.uid.is_some() && ids.gid.is_some()) {
        let gid = ids.gid.filter(|_| ids.uid.is_some());
        // SAFETY: only async-signal-safe libc calls, no allocation.
        unsafe {
            command.pre_exec(move || {
                if let Some(mask) = umask {
                    libc::umask(mask as libc::mode_t);
                }
                if let Some(gid) = gid {
                    let gid = gid as libc::gid_t;
                    if libc::setgroups(1, &gid) != 0 {
                        return Err(std::io::Error::last_os_error());
                    }
                }
                Ok(())
            });
        }
    }

    tracing::debug!(program = %ctx.name, command = %program, ?args, "spawning");
    command.spawn().map_err(SpawnError::Spawn)
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
