//! Test helpers for behavioral specifications.
//!
//! Provides a small builder for running the encab binary against a
//! config written into a fresh temp directory.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

/// Poll interval and cap for "is it still running" checks.
pub const SPEC_POLL_INTERVAL: Duration = Duration::from_millis(10);
pub const SPEC_WAIT_MAX: Duration = Duration::from_secs(5);

/// Path to the encab binary under test.
pub fn encab_binary() -> PathBuf {
    assert_cmd::cargo::cargo_bin("encab")
}

/// Builder for one encab invocation.
pub struct EncabRun {
    dir: tempfile::TempDir,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    removed_envs: Vec<String>,
    config_written: bool,
}

/// Start building a run over the given config document.
pub fn encab(config_yaml: &str) -> EncabRun {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("encab.yml");
    std::fs::write(&config_path, config_yaml).unwrap();
    EncabRun {
        dir,
        args: Vec::new(),
        envs: vec![(
            "ENCAB_CONFIG".to_string(),
            config_path.to_string_lossy().into_owned(),
        )],
        removed_envs: Vec::new(),
        config_written: true,
    }
}

/// A run with no config file at all (discovery failures etc.).
pub fn encab_without_config() -> EncabRun {
    let dir = tempfile::tempdir().unwrap();
    EncabRun {
        dir,
        args: Vec::new(),
        envs: Vec::new(),
        removed_envs: vec!["ENCAB_CONFIG".to_string()],
        config_written: false,
    }
}

impl EncabRun {
    /// Positional arguments (the `main` argv override).
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Extra environment for the supervisor process.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    /// Remove a variable from the supervisor's environment (including
    /// anything the builder itself set, e.g. ENCAB_CONFIG).
    pub fn env_remove(mut self, key: &str) -> Self {
        self.envs.retain(|(k, _)| k != key);
        self.removed_envs.push(key.to_string());
        self
    }

    /// The temp directory the config lives in (and the process cwd).
    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(encab_binary());
        cmd.args(&self.args)
            .current_dir(self.dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for key in &self.removed_envs {
            cmd.env_remove(key);
        }
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run to completion.
    pub fn output(self) -> Output {
        self.command().output().unwrap()
    }

    /// Spawn without waiting (for signal-driven scenarios).
    pub fn spawn(self) -> (Child, tempfile::TempDir) {
        let child = self.command().spawn().unwrap();
        (child, self.dir)
    }
}

/// Stdout of a finished run, as lines.
pub fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

pub fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Index of the first line equal to `needle`, with a useful panic.
pub fn line_index(lines: &[String], needle: &str) -> usize {
    lines
        .iter()
        .position(|l| l == needle)
        .unwrap_or_else(|| panic!("line `{needle}` not found in {lines:#?}"))
}

/// Send a signal to a spawned supervisor.
pub fn send_signal(child: &Child, signal: nix::sys::signal::Signal) {
    nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(child.id() as i32),
        signal,
    )
    .unwrap();
}

/// Wait until the predicate holds or the cap elapses.
pub fn wait_until(mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + SPEC_WAIT_MAX;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(SPEC_POLL_INTERVAL);
    }
    false
}
