// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! log_sanitizer: masks secret values in the log stream.
//!
//! Values of environment variables whose names match a glob pattern set
//! are registered with the logger, which replaces every occurrence in a
//! record message with `******`. Built-in patterns: `*KEY*`, `*SECRET*`,
//! `*PASSWORD*` (case-insensitive).

use crate::api::{parse_settings, Extension, ExtensionError, Settings};
use async_trait::async_trait;
use encab_config::ProgramConfig;
use encab_core::Logger;
use encab_engine::env::ExtensionEnv;
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

const BUILTIN_PATTERNS: [&str; 3] = ["*KEY*", "*SECRET*", "*PASSWORD*"];

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct SanitizerSettings {
    /// Replaces the built-in pattern set when present.
    patterns: Option<Vec<String>>,
    /// Appended to whichever pattern set is in effect.
    extra_patterns: Vec<String>,
}

pub struct LogSanitizer {
    matchers: Vec<Regex>,
}

impl LogSanitizer {
    pub fn new() -> Self {
        Self {
            matchers: Vec::new(),
        }
    }

    fn compile(settings: &Settings) -> Result<Vec<Regex>, ExtensionError> {
        let parsed: SanitizerSettings = parse_settings(settings)?;
        let mut globs: Vec<String> = match parsed.patterns {
            Some(patterns) => patterns,
            None => BUILTIN_PATTERNS.iter().map(|p| p.to_string()).collect(),
        };
        globs.extend(parsed.extra_patterns);
        globs.iter().map(|g| glob_to_regex(g)).collect()
    }

    fn matches(&self, name: &str) -> bool {
        self.matchers.iter().any(|m| m.is_match(name))
    }
}

impl Default for LogSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate a shell-style glob into an anchored case-insensitive regex.
fn glob_to_regex(glob: &str) -> Result<Regex, ExtensionError> {
    let mut pattern = String::from("(?i)^");
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            c => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    pattern.push('$');
    Regex::new(&pattern)
        .map_err(|e| ExtensionError::Settings(format!("bad pattern `{glob}`: {e}")))
}

#[async_trait]
impl Extension for LogSanitizer {
    fn name(&self) -> &'static str {
        "log_sanitizer"
    }

    /// Active even when the config never mentions it.
    fn default_enabled(&self, _configured: bool) -> bool {
        true
    }

    fn validate(&self, settings: &Settings) -> Result<(), ExtensionError> {
        Self::compile(settings).map(|_| ())
    }

    async fn configure(
        &mut self,
        settings: &Settings,
        logger: &Logger,
    ) -> Result<(), ExtensionError> {
        self.matchers = Self::compile(settings)?;
        // The process environment is the first source of secrets; config
        // and extension layers are picked up in update_environment.
        for (name, value) in std::env::vars() {
            if self.matches(&name) {
                logger.add_secret(value);
            }
        }
        tracing::debug!(secrets = logger.secret_count(), "sanitizer configured");
        Ok(())
    }

    async fn update_environment(
        &self,
        env: &mut ExtensionEnv,
        programs: &mut IndexMap<String, ProgramConfig>,
        logger: &Logger,
    ) -> Result<(), ExtensionError> {
        for (name, value) in env.iter() {
            if self.matches(name) {
                logger.add_secret(value.clone());
            }
        }
        for program in programs.values() {
            for (name, value) in &program.environment {
                if let Some(value) = value {
                    if self.matches(name) {
                        logger.add_secret(value.to_env_string());
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "sanitizer_tests.rs"]
mod tests;
