// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! log_collector: tails files into the unified log stream.
//!
//! Each configured source gets a background task that polls a file (or a
//! `path_pattern` with `%(VAR)e` environment and `%(fmt)d` strftime
//! substitution, re-evaluated every poll) and emits each new line through
//! the logger under the source's name. Content that predates the
//! supervisor is skipped; truncation or a pattern resolving to a new path
//! restarts reading from the top.

use crate::api::{parse_settings, Extension, ExtensionError, ExtensionTasks, Settings};
use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use encab_core::{LogLevel, Logger};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::watch;

const DEFAULT_POLL_MS: u64 = 500;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct CollectorSettings {
    sources: IndexMap<String, SourceDef>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct SourceDef {
    /// Fixed file path. Mutually exclusive with `path_pattern`.
    path: Option<PathBuf>,
    /// Path with `%(VAR)e` / `%(fmt)d` substitution, re-evaluated each poll.
    path_pattern: Option<String>,
    loglevel: Option<LogLevel>,
    poll_ms: Option<u64>,
}

pub struct LogCollector {
    settings: CollectorSettings,
}

impl LogCollector {
    pub fn new() -> Self {
        Self {
            settings: CollectorSettings::default(),
        }
    }
}

impl Default for LogCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extension for LogCollector {
    fn name(&self) -> &'static str {
        "log_collector"
    }

    fn validate(&self, settings: &Settings) -> Result<(), ExtensionError> {
        let parsed: CollectorSettings = parse_settings(settings)?;
        for (name, source) in &parsed.sources {
            match (&source.path, &source.path_pattern) {
                (Some(_), Some(_)) => {
                    return Err(ExtensionError::Settings(format!(
                        "source `{name}`: `path` and `path_pattern` are mutually exclusive"
                    )))
                }
                (None, None) => {
                    return Err(ExtensionError::Settings(format!(
                        "source `{name}`: needs `path` or `path_pattern`"
                    )))
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn configure(
        &mut self,
        settings: &Settings,
        _logger: &Logger,
    ) -> Result<(), ExtensionError> {
        self.settings = parse_settings(settings)?;
        Ok(())
    }

    fn extend(&self, tasks: &mut ExtensionTasks, logger: &Logger) -> Result<(), ExtensionError> {
        for (name, source) in &self.settings.sources {
            let level = source.loglevel.unwrap_or_default();
            // The source's records must pass its own threshold.
            logger.set_level(name.clone(), level);
            let task = TailTask {
                name: name.clone(),
                source: source.clone(),
                level,
                logger: logger.clone(),
                shutdown: tasks.shutdown_signal(),
            };
            tasks.register(tokio::spawn(task.run()));
        }
        Ok(())
    }
}

struct TailTask {
    name: String,
    source: SourceDef,
    level: LogLevel,
    logger: Logger,
    shutdown: watch::Receiver<bool>,
}

#[derive(Default)]
struct TailState {
    path: Option<PathBuf>,
    offset: u64,
    pending: Vec<u8>,
}

impl TailTask {
    async fn run(mut self) {
        let poll = Duration::from_millis(self.source.poll_ms.unwrap_or(DEFAULT_POLL_MS));
        let mut state = TailState::default();
        tracing::debug!(source = %self.name, "log collector source started");
        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    // Treat a dropped sender like a shutdown.
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(poll) => {
                    self.poll_once(&mut state).await;
                }
            }
        }
        // Final sweep so lines written just before shutdown are not lost.
        self.poll_once(&mut state).await;
        if !state.pending.is_empty() {
            self.emit(&state.pending);
        }
        tracing::debug!(source = %self.name, "log collector source stopped");
    }

    fn resolved_path(&self) -> PathBuf {
        match (&self.source.path, &self.source.path_pattern) {
            (Some(path), _) => path.clone(),
            (None, Some(pattern)) => PathBuf::from(substitute_pattern(pattern, Local::now())),
            (None, None) => PathBuf::new(),
        }
    }

    async fn poll_once(&self, state: &mut TailState) {
        let resolved = self.resolved_path();
        if state.path.as_ref() != Some(&resolved) {
            // First resolution skips pre-existing content (tail semantics);
            // a later change of target reads the new file from the top.
            state.offset = if state.path.is_none() {
                tokio::fs::metadata(&resolved)
                    .await
                    .map(|m| m.len())
                    .unwrap_or(0)
            } else {
                0
            };
            state.pending.clear();
            state.path = Some(resolved.clone());
        }

        let len = match tokio::fs::metadata(&resolved).await {
            Ok(meta) => meta.len(),
            Err(_) => return,
        };
        if len < state.offset {
            // Truncated or rewritten in place.
            state.offset = 0;
            state.pending.clear();
        }
        if len == state.offset {
            return;
        }

        let mut file = match tokio::fs::File::open(&resolved).await {
            Ok(file) => file,
            Err(e) => {
                tracing::debug!(source = %self.name, error = %e, "open failed");
                return;
            }
        };
        if file
            .seek(std::io::SeekFrom::Start(state.offset))
            .await
            .is_err()
        {
            return;
        }
        let mut new_bytes = Vec::with_capacity((len - state.offset) as usize);
        match file.read_to_end(&mut new_bytes).await {
            Ok(read) => state.offset += read as u64,
            Err(e) => {
                tracing::debug!(source = %self.name, error = %e, "read failed");
                return;
            }
        }

        state.pending.extend_from_slice(&new_bytes);
        while let Some(pos) = state.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = state.pending.drain(..=pos).collect();
            self.emit(&line[..line.len() - 1]);
        }
    }

    fn emit(&self, bytes: &[u8]) {
        let message = String::from_utf8_lossy(bytes).into_owned();
        self.logger.emit(&self.name, self.level, message);
    }
}

/// Substitute `%(VAR)e` (environment) and `%(fmt)d` (strftime) directives.
/// Anything malformed is left literal.
fn substitute_pattern(pattern: &str, now: DateTime<Local>) -> String {
    let mut out = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' || chars.peek() != Some(&'(') {
            out.push(c);
            continue;
        }
        chars.next();
        let mut inner = String::new();
        let mut closed = false;
        for c2 in chars.by_ref() {
            if c2 == ')' {
                closed = true;
                break;
            }
            inner.push(c2);
        }
        if !closed {
            out.push_str("%(");
            out.push_str(&inner);
            break;
        }
        match chars.next() {
            Some('e') => out.push_str(&std::env::var(&inner).unwrap_or_default()),
            Some('d') => {
                let items: Vec<Item> = StrftimeItems::new(&inner).collect();
                if items.iter().any(|item| matches!(item, Item::Error)) {
                    out.push_str("%(");
                    out.push_str(&inner);
                    out.push_str(")d");
                } else {
                    out.push_str(&now.format_with_items(items.iter()).to_string());
                }
            }
            Some(other) => {
                out.push_str("%(");
                out.push_str(&inner);
                out.push(')');
                out.push(other);
            }
            None => {
                out.push_str("%(");
                out.push_str(&inner);
                out.push(')');
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "collector_tests.rs"]
mod tests;
