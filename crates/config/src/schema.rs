// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serde types for the `encab.yml` document.

use crate::argv::{split_command_line, SplitError};
use encab_core::LogLevel;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Environment value as written in YAML. Scalars are stringified when the
/// effective environment is built; an explicit `null` removes the variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl EnvValue {
    pub fn to_env_string(&self) -> String {
        match self {
            EnvValue::String(s) => s.clone(),
            EnvValue::Int(i) => i.to_string(),
            EnvValue::Float(f) => f.to_string(),
            EnvValue::Bool(b) => b.to_string(),
        }
    }
}

/// Environment mapping in declared order; `None` removes the variable.
pub type EnvMap = IndexMap<String, Option<EnvValue>>;

/// `command` as written: one string (tokenized with shell quoting rules)
/// or an explicit argv sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    Line(String),
    Argv(Vec<String>),
}

impl CommandLine {
    /// Argv tokens of either form.
    pub fn tokens(&self) -> Result<Vec<String>, SplitError> {
        match self {
            CommandLine::Line(line) => split_command_line(line),
            CommandLine::Argv(argv) => Ok(argv.clone()),
        }
    }
}

/// `sh` as written: one snippet or a sequence of snippets, each run as
/// `/bin/sh -c <snippet>` in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Snippets {
    One(String),
    Many(Vec<String>),
}

impl Snippets {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Snippets::One(s) => std::slice::from_ref(s),
            Snippets::Many(v) => v.as_slice(),
        }
    }
}

/// File-mode mask: integer as-is, or a string parsed as octal (`"022"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Umask {
    Bits(u32),
    Text(String),
}

impl Umask {
    /// Numeric mask, range-checked to `0..=0o777`.
    pub fn bits(&self) -> Result<u32, String> {
        let bits = match self {
            Umask::Bits(b) => *b,
            Umask::Text(s) => {
                u32::from_str_radix(s.trim_start_matches("0o"), 8)
                    .map_err(|e| format!("not an octal number: {e}"))?
            }
        };
        if bits > 0o777 {
            return Err(format!("out of range (max 0o777): 0o{bits:o}"));
        }
        Ok(bits)
    }
}

/// User to run a program as: numeric uid or resolvable name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(u32),
    Name(String),
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRef::Id(id) => write!(f, "{id}"),
            UserRef::Name(name) => f.write_str(name),
        }
    }
}

/// Group to run a program as: numeric gid or resolvable name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupRef {
    Id(u32),
    Name(String),
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupRef::Id(id) => write!(f, "{id}"),
            GroupRef::Name(name) => f.write_str(name),
        }
    }
}

/// One supervised program. Immutable after validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct ProgramConfig {
    /// Argv-style invocation. Mutually exclusive with `sh`.
    pub command: Option<CommandLine>,
    /// Shell snippets run via `/bin/sh -c`. Mutually exclusive with `command`.
    pub sh: Option<Snippets>,
    /// Highest-precedence environment layer for this program.
    pub environment: EnvMap,
    pub user: Option<UserRef>,
    pub group: Option<GroupRef>,
    pub umask: Option<Umask>,
    /// Working directory; inherits the supervisor's when unset.
    pub directory: Option<PathBuf>,
    /// Seconds to sleep before spawning.
    pub startup_delay: f64,
    /// Seconds the supervisor waits for lifecycle transitions.
    /// Normalized to 1.0 when unset here and in `encab`.
    pub join_time: Option<f64>,
    /// When set, the program is respawned this many seconds after it
    /// exits. Helpers only; `main` never auto-restarts.
    pub restart_delay: Option<f64>,
    /// Severity of stdout lines and display threshold for this program.
    /// stderr lines are always tagged ERROR.
    pub loglevel: Option<LogLevel>,
    /// Reap orphaned descendants. Honored on `main` when encab is PID 1.
    pub reap_zombies: bool,
    /// Shortcut for `loglevel: DEBUG`.
    pub debug: bool,
}

/// Global settings and per-program defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct EncabConfig {
    /// When true and `main` exits, keep helpers running and park instead
    /// of shutting down (container post-mortem aid).
    pub halt_on_exit: bool,
    /// Record template; see the formatting module of the core crate.
    pub logformat: Option<String>,
    /// Validate and run extension setup, but spawn nothing.
    pub dry_run: bool,
    /// Environment layer under every program's own `environment`.
    pub environment: EnvMap,
    pub user: Option<UserRef>,
    pub group: Option<GroupRef>,
    pub umask: Option<Umask>,
    pub loglevel: Option<LogLevel>,
    pub debug: bool,
    pub join_time: Option<f64>,
}

/// Per-extension toggle and opaque settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct ExtensionConfig {
    /// `None` keeps the extension's own default.
    pub enabled: Option<bool>,
    /// External module identifier. Rejected: the registry is build-time.
    pub module: Option<String>,
    /// Passed to the extension untouched.
    pub settings: serde_yaml::Value,
}

impl ExtensionConfig {
    /// Whether the user explicitly asked for this extension. Explicit
    /// enables turn hook failures into startup aborts.
    pub fn explicitly_enabled(&self) -> bool {
        self.enabled == Some(true)
    }
}

/// The whole `encab.yml` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct Document {
    pub encab: EncabConfig,
    pub extensions: IndexMap<String, ExtensionConfig>,
    /// Supervised programs in declared order. Helpers start in this order
    /// and stop in reverse.
    pub programs: IndexMap<String, ProgramConfig>,
}

impl Document {
    /// The `main` program, if configured.
    pub fn main_program(&self) -> Option<&ProgramConfig> {
        self.programs.get(encab_core::MAIN_PROGRAM)
    }

    /// Helper names in declared order.
    pub fn helper_names(&self) -> Vec<String> {
        self.programs
            .keys()
            .filter(|name| name.as_str() != encab_core::MAIN_PROGRAM)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
