// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor: the one owner of program state.
//!
//! Everything arrives through a single mailbox — runner transition
//! proposals, pid acks, log-loss notices, shutdown requests from the
//! signal router — and is applied here, in order. Helpers start in
//! declared order and stop in reverse; `main`'s lifetime bounds the
//! supervisor's unless `halt_on_exit` parks it for post-mortem
//! inspection.

use crate::host::ExtensionHost;
use crate::signals;
use encab_config::Document;
use encab_core::{
    LogFormat, Logger, ProgramState, RuntimeRecord, ShutdownKind, SupervisorEvent,
    MAIN_PROGRAM, SUPERVISOR_PROGRAM,
};
use encab_engine::env::{effective_environment, ExtensionEnv};
use encab_engine::reaper::{spawn_reaper, OwnedPids};
use encab_engine::runner::{spawn_program, ProgramHandle, RunnerContext};
use encab_extensions::ExtensionTasks;
use indexmap::IndexMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Mailbox depth. Deep enough that runners never block on bursts of
/// transition proposals while the supervisor is mid-await.
const EVENT_CAPACITY: usize = 256;

/// Extra slack on top of the graceful + forced budgets when waiting for
/// one program's terminal state during shutdown.
const SHUTDOWN_MARGIN: Duration = Duration::from_millis(500);

/// Run the supervisor over a validated, normalized config.
///
/// Returns the process exit code per the shutdown contract: `main`'s
/// code, 128+signal if `main` was signalled, 1 on startup failure, 0 for
/// a dry run.
pub async fn run(doc: Document, argv_override: Option<Vec<String>>, logger: Logger) -> i32 {
    Supervisor::new(doc, argv_override, logger).run().await
}

pub struct Supervisor {
    doc: Document,
    logger: Logger,
    events_tx: mpsc::Sender<SupervisorEvent>,
    events_rx: mpsc::Receiver<SupervisorEvent>,
    records: IndexMap<String, RuntimeRecord>,
    handles: IndexMap<String, ProgramHandle>,
    owned_pids: OwnedPids,
    extension_env: ExtensionEnv,
    argv_override: Option<Vec<String>>,
    /// Shutdown has begun; no more restarts or spawns.
    stopping: bool,
    /// A shutdown signal arrived.
    shutdown_requested: bool,
    /// Second signal: all graceful waits are cancelled.
    immediate: bool,
    /// Parked after `main` exited with `halt_on_exit` set.
    halted: bool,
}

impl Supervisor {
    pub fn new(doc: Document, argv_override: Option<Vec<String>>, logger: Logger) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        Self {
            doc,
            logger,
            events_tx,
            events_rx,
            records: IndexMap::new(),
            handles: IndexMap::new(),
            owned_pids: OwnedPids::new(),
            extension_env: ExtensionEnv::new(),
            argv_override,
            stopping: false,
            shutdown_requested: false,
            immediate: false,
            halted: false,
        }
    }

    pub async fn run(mut self) -> i32 {
        self.apply_log_config();

        // Extension hooks: validate → configure → update_environment →
        // update_config. Any abort here exits 1 before a single spawn.
        let mut host = match ExtensionHost::discover(&self.doc) {
            Ok(host) => host,
            Err(e) => return self.startup_error(e),
        };
        if let Err(e) = host.validate_all(&self.logger) {
            return self.startup_error(e);
        }
        if let Err(e) = host.configure_all(&self.logger).await {
            return self.startup_error(e);
        }

        // Dry run stops here, before update_environment: that hook may run
        // startup-script snippets, and a dry run must stay side-effect
        // free beyond its log output.
        if self.doc.encab.dry_run {
            for name in host.names() {
                self.logger.info(name, "settings are valid.");
            }
            self.logger.info(SUPERVISOR_PROGRAM, "settings are valid.");
            self.logger
                .info(SUPERVISOR_PROGRAM, "Dry run succeeded. Exiting.");
            return 0;
        }

        let mut extension_env = ExtensionEnv::new();
        if let Err(e) = host
            .update_environment_all(&mut extension_env, &mut self.doc.programs, &self.logger)
            .await
        {
            return self.startup_error(e);
        }
        self.extension_env = extension_env;
        if let Err(e) = host.update_config_all(&mut self.doc, &self.logger) {
            return self.startup_error(e);
        }
        // update_config may have injected a log pattern or levels.
        self.apply_log_config();

        self.logger.info(SUPERVISOR_PROGRAM, "starting…");

        let signal_task = match signals::install(self.events_tx.clone()) {
            Ok(task) => task,
            Err(e) => {
                self.logger
                    .critical(SUPERVISOR_PROGRAM, format!("signal setup failed: {e}"));
                return 1;
            }
        };
        let reaper = self.maybe_start_reaper();

        // Long-running extension tasks start alongside helpers.
        let (ext_stop_tx, ext_stop_rx) = watch::channel(false);
        let mut tasks = ExtensionTasks::new(ext_stop_rx);
        if let Err(e) = host.extend_all(&mut tasks, &self.logger) {
            self.logger.error(SUPERVISOR_PROGRAM, e.to_string());
            signal_task.abort();
            self.stop_reaper(reaper).await;
            return 1;
        }
        let extension_tasks = tasks.into_handles();

        for name in self.doc.programs.keys() {
            self.records.insert(name.clone(), RuntimeRecord::new());
        }

        // Helpers in declared order, each given its join_time to come up.
        let mut startup_failed = false;
        for name in self.doc.helper_names() {
            if self.shutdown_requested {
                break;
            }
            self.start_program(&name);
            let budget = self.join_time(&name);
            self.wait_started(&name, budget).await;
            if matches!(
                self.state(&name),
                Some(ProgramState::Failed { .. } | ProgramState::Crashed { .. })
            ) {
                self.logger.error(
                    SUPERVISOR_PROGRAM,
                    format!("helper {name} failed during startup; aborting"),
                );
                startup_failed = true;
                break;
            }
        }

        let mut main_started = false;
        if !startup_failed
            && !self.shutdown_requested
            && self.doc.programs.contains_key(MAIN_PROGRAM)
        {
            self.start_program(MAIN_PROGRAM);
            main_started = true;
            self.steady_loop().await;
        }

        self.shutdown_sequence().await;

        // Teardown: extension tasks, reaper, signal router, runners.
        let _ = ext_stop_tx.send(true);
        for mut handle in extension_tasks {
            if tokio::time::timeout(Duration::from_secs(1), &mut handle)
                .await
                .is_err()
            {
                tracing::debug!("extension task did not stop in time; aborting");
                handle.abort();
            }
        }
        self.stop_reaper(reaper).await;
        signal_task.abort();

        self.exit_code(main_started, startup_failed)
    }

    // ── startup pieces ────────────────────────────────────────────────

    fn apply_log_config(&self) {
        if let Some(format) = &self.doc.encab.logformat {
            self.logger.set_format(LogFormat::parse(format));
        }
        self.logger
            .set_default_level(self.doc.encab.loglevel.unwrap_or_default());
        for (name, program) in &self.doc.programs {
            if let Some(level) = program.loglevel {
                self.logger.set_level(name.clone(), level);
            }
        }
    }

    fn startup_error(&self, error: impl std::fmt::Display) -> i32 {
        self.logger.error(SUPERVISOR_PROGRAM, error.to_string());
        1
    }

    fn maybe_start_reaper(&self) -> Option<(oneshot::Sender<()>, JoinHandle<()>)> {
        if !self.doc.programs.values().any(|p| p.reap_zombies) {
            return None;
        }
        if std::process::id() != 1 {
            self.logger.warning(
                SUPERVISOR_PROGRAM,
                "reap_zombies is set but encab is not PID 1; reaper disabled",
            );
            return None;
        }
        let (tx, rx) = oneshot::channel();
        let handle = spawn_reaper(self.owned_pids.clone(), self.logger.clone(), rx);
        Some((tx, handle))
    }

    async fn stop_reaper(&self, reaper: Option<(oneshot::Sender<()>, JoinHandle<()>)>) {
        if let Some((tx, handle)) = reaper {
            let _ = tx.send(());
            let _ = handle.await;
        }
    }

    fn start_program(&mut self, name: &str) {
        let config = match self.doc.programs.get(name) {
            Some(config) => config.clone(),
            None => return,
        };
        let environment = effective_environment(
            std::env::vars(),
            &self.doc.encab.environment,
            &self.extension_env,
            &config.environment,
        );
        let handle = spawn_program(RunnerContext {
            name: name.to_string(),
            config,
            environment,
            argv_override: if name == MAIN_PROGRAM {
                self.argv_override.clone()
            } else {
                None
            },
            logger: self.logger.clone(),
            events: self.events_tx.clone(),
            owned_pids: self.owned_pids.clone(),
        });
        self.handles.insert(name.to_string(), handle);
    }

    // ── event application ─────────────────────────────────────────────

    fn handle_event(&mut self, event: SupervisorEvent) {
        match event {
            SupervisorEvent::State { program, state } => self.apply_state(&program, state),
            SupervisorEvent::Pid { program, pid } => {
                if let Some(record) = self.records.get_mut(&program) {
                    record.set_pid(pid);
                }
            }
            SupervisorEvent::LogLoss { program, stream } => {
                self.logger.warning(
                    &program,
                    format!("output on {} was lost", stream.as_str()),
                );
            }
            SupervisorEvent::RestartDue { program } => {
                if self.stopping {
                    return;
                }
                if self
                    .state(&program)
                    .map(ProgramState::is_terminal)
                    .unwrap_or(false)
                {
                    self.logger.debug(&program, "restarting");
                    self.start_program(&program);
                }
            }
            SupervisorEvent::Shutdown { kind } => {
                self.shutdown_requested = true;
                self.stopping = true;
                if kind == ShutdownKind::Immediate && !self.immediate {
                    self.immediate = true;
                    self.logger
                        .warning(SUPERVISOR_PROGRAM, "second signal, killing all programs");
                    self.kill_all();
                }
            }
        }
    }

    fn apply_state(&mut self, program: &str, state: ProgramState) {
        let Some(record) = self.records.get_mut(program) else {
            tracing::warn!(program, "state proposal for unknown program");
            return;
        };
        let previous = record.state.clone();
        match record.apply(program, state) {
            Ok(()) => {
                let current = record.state.clone();
                self.logger
                    .debug(program, format!("state: {previous} -> {current}"));
                if current.is_terminal() {
                    self.maybe_schedule_restart(program);
                }
            }
            Err(e) => {
                tracing::warn!(program, error = %e, "rejected state transition");
            }
        }
    }

    /// Helpers with `restart_delay` respawn after the delay, any exit,
    /// unless shutdown has begun.
    fn maybe_schedule_restart(&self, program: &str) {
        if program == MAIN_PROGRAM || self.stopping {
            return;
        }
        let Some(delay) = self
            .doc
            .programs
            .get(program)
            .and_then(|p| p.restart_delay)
        else {
            return;
        };
        self.logger.debug(
            program,
            format!("scheduling restart in {delay}s"),
        );
        let events = self.events_tx.clone();
        let program = program.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
            let _ = events
                .send(SupervisorEvent::RestartDue { program })
                .await;
        });
    }

    fn kill_all(&self) {
        for (name, handle) in &self.handles {
            if !self
                .state(name)
                .map(ProgramState::is_terminal)
                .unwrap_or(true)
            {
                handle.kill();
            }
        }
    }

    // ── waiting primitives (all event-driven) ─────────────────────────

    fn state(&self, program: &str) -> Option<&ProgramState> {
        self.records.get(program).map(|r| &r.state)
    }

    fn join_time(&self, program: &str) -> Duration {
        let seconds = self
            .doc
            .programs
            .get(program)
            .and_then(|p| p.join_time)
            .unwrap_or(1.0);
        Duration::from_secs_f64(seconds)
    }

    /// Drain events until the program leaves `Init`/`Starting` (Running
    /// or terminal), the budget runs out, or shutdown is requested.
    async fn wait_started(&mut self, program: &str, budget: Duration) {
        let deadline = tokio::time::Instant::now() + budget;
        loop {
            match self.state(program) {
                Some(ProgramState::Init | ProgramState::Starting) => {}
                _ => return,
            }
            if self.shutdown_requested {
                return;
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return;
            }
            match tokio::time::timeout(deadline - now, self.events_rx.recv()).await {
                Ok(Some(event)) => self.handle_event(event),
                Ok(None) | Err(_) => return,
            }
        }
    }

    /// Drain events until the program is terminal or the budget runs out.
    /// Returns whether a terminal state was reached.
    async fn wait_terminal(&mut self, program: &str, budget: Duration) -> bool {
        if self.records.get(program).is_none() {
            return true;
        }
        let deadline = tokio::time::Instant::now() + budget;
        loop {
            if self
                .state(program)
                .map(ProgramState::is_terminal)
                .unwrap_or(true)
            {
                return true;
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return false;
            }
            match tokio::time::timeout(deadline - now, self.events_rx.recv()).await {
                Ok(Some(event)) => self.handle_event(event),
                Ok(None) | Err(_) => return false,
            }
        }
    }

    // ── steady state and shutdown ─────────────────────────────────────

    /// Block until `main` terminates (unless parked) or shutdown is
    /// requested. Helper exits and restarts are serviced here too.
    async fn steady_loop(&mut self) {
        loop {
            if self.shutdown_requested {
                return;
            }
            if self
                .state(MAIN_PROGRAM)
                .map(ProgramState::is_terminal)
                .unwrap_or(false)
            {
                if !self.doc.encab.halt_on_exit {
                    return;
                }
                if !self.halted {
                    self.halted = true;
                    self.logger.warning(
                        SUPERVISOR_PROGRAM,
                        "main exited but halt_on_exit is set; helpers stay up until a shutdown signal",
                    );
                }
            }
            match self.events_rx.recv().await {
                Some(event) => self.handle_event(event),
                None => return,
            }
        }
    }

    /// Stop everything: `main` first (if still up), then helpers in
    /// reverse declared order, each bounded by graceful + forced budgets.
    async fn shutdown_sequence(&mut self) {
        self.stopping = true;

        if self.handles.contains_key(MAIN_PROGRAM) {
            self.request_stop(MAIN_PROGRAM);
            let budget = self.join_time(MAIN_PROGRAM) * 2 + SHUTDOWN_MARGIN;
            self.wait_terminal(MAIN_PROGRAM, budget).await;
        }

        let mut helpers = self.doc.helper_names();
        helpers.reverse();
        for name in helpers {
            if !self.handles.contains_key(&name) {
                continue;
            }
            self.request_stop(&name);
            let budget = self.join_time(&name) * 2 + SHUTDOWN_MARGIN;
            if !self.wait_terminal(&name, budget).await {
                // Keep going; the runner's own escalation will finish it
                // and the final join below collects it.
                self.logger
                    .warning(&name, "did not stop within its budget; continuing");
            }
        }

        // Collect every runner so all exit lines are flushed, draining
        // the mailbox meanwhile so no runner can block on a full channel.
        for (name, handle) in std::mem::take(&mut self.handles) {
            tracing::debug!(program = %name, "joining runner");
            let mut join = std::pin::pin!(handle.join());
            loop {
                tokio::select! {
                    _ = &mut join => break,
                    Some(event) = self.events_rx.recv() => self.handle_event(event),
                }
            }
        }
        // Apply any transitions still in the mailbox.
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
    }

    fn request_stop(&self, program: &str) {
        if self
            .state(program)
            .map(ProgramState::is_terminal)
            .unwrap_or(true)
        {
            return;
        }
        if let Some(handle) = self.handles.get(program) {
            if self.immediate {
                handle.kill();
            } else {
                handle.stop();
            }
        }
    }

    fn exit_code(&self, main_started: bool, startup_failed: bool) -> i32 {
        if startup_failed {
            return 1;
        }
        if !main_started {
            // Nothing to run (empty config) or a signal arrived before
            // main ever started; neither is an error.
            return 0;
        }
        match self.state(MAIN_PROGRAM) {
            Some(ProgramState::Exited { code }) => *code,
            Some(ProgramState::Crashed { signal }) => 128 + signal,
            Some(ProgramState::Failed { .. }) => 1,
            _ => 1,
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
