// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for configuration loading and validation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced before any program is spawned. All of them map to
/// supervisor exit code 1.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("no config file found (searched: {searched})")]
    NotFound { searched: String },

    #[error("`programs` is non-empty but no program is named `main`")]
    MissingMain,

    #[error("program `{0}`: `command` and `sh` are mutually exclusive")]
    CommandAndSh(String),

    #[error("program `{0}`: needs `command` or `sh` (only `main` may rely on CLI arguments)")]
    NoCommand(String),

    #[error("program `{program}`: invalid command: {message}")]
    BadCommand { program: String, message: String },

    #[error("program `{program}`: {field} must be non-negative, got {value}")]
    NegativeDuration {
        program: String,
        field: &'static str,
        value: f64,
    },

    #[error("program `main` must not set `restart_delay`")]
    MainRestart,

    #[error("invalid umask `{value}`: {message}")]
    BadUmask { value: String, message: String },

    #[error("invalid {name} value `{value}` (expected 0 or 1)")]
    BadEnvOverride { name: &'static str, value: String },
}
