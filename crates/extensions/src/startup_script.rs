// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! startup_script: environment assembly before any program spawns.
//!
//! Three ordered steps, each inheriting what the previous ones built:
//! `loadenv` reads a dotenv-format file, `buildenv` runs shell snippets
//! whose stdout is parsed as further dotenv lines, and `sh` runs snippets
//! for side effects only. A failing step aborts startup.

use crate::api::{parse_settings, Extension, ExtensionError, Settings};
use async_trait::async_trait;
use encab_config::{ProgramConfig, Snippets};
use encab_core::Logger;
use encab_engine::env::ExtensionEnv;
use encab_engine::subprocess::{run_with_timeout, SCRIPT_TIMEOUT};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct ScriptSettings {
    /// Dotenv-format file loaded first.
    loadenv: Option<PathBuf>,
    /// Snippets whose stdout contributes further dotenv lines.
    buildenv: Option<Snippets>,
    /// Snippets run for side effects only.
    sh: Option<Snippets>,
}

pub struct StartupScript {
    settings: ScriptSettings,
}

impl StartupScript {
    pub fn new() -> Self {
        Self {
            settings: ScriptSettings::default(),
        }
    }
}

impl Default for StartupScript {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extension for StartupScript {
    fn name(&self) -> &'static str {
        "startup_script"
    }

    fn validate(&self, settings: &Settings) -> Result<(), ExtensionError> {
        parse_settings::<ScriptSettings>(settings).map(|_| ())
    }

    async fn configure(
        &mut self,
        settings: &Settings,
        _logger: &Logger,
    ) -> Result<(), ExtensionError> {
        self.settings = parse_settings(settings)?;
        Ok(())
    }

    async fn update_environment(
        &self,
        env: &mut ExtensionEnv,
        _programs: &mut IndexMap<String, ProgramConfig>,
        logger: &Logger,
    ) -> Result<(), ExtensionError> {
        if let Some(path) = &self.settings.loadenv {
            let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                ExtensionError::Script(format!("loadenv {}: {e}", path.display()))
            })?;
            for (key, value) in parse_dotenv(&text) {
                env.insert(key, value);
            }
            logger.debug(
                "startup_script",
                format!("loaded environment from {}", path.display()),
            );
        }

        if let Some(buildenv) = &self.settings.buildenv {
            for snippet in buildenv.as_slice() {
                let output = run_snippet(snippet, env).await?;
                for (key, value) in parse_dotenv(&output) {
                    env.insert(key, value);
                }
            }
        }

        if let Some(sh) = &self.settings.sh {
            for snippet in sh.as_slice() {
                let output = run_snippet(snippet, env).await?;
                for line in output.lines().filter(|l| !l.is_empty()) {
                    logger.debug("startup_script", line);
                }
            }
        }
        Ok(())
    }
}

/// Run one snippet with the accumulated environment, returning stdout.
async fn run_snippet(snippet: &str, env: &ExtensionEnv) -> Result<String, ExtensionError> {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(snippet).envs(env.iter());
    let output = run_with_timeout(cmd, SCRIPT_TIMEOUT, "startup script")
        .await
        .map_err(ExtensionError::Script)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtensionError::Script(format!(
            "`{snippet}` exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse dotenv-format text: `KEY=VALUE` lines, `#` comments, optional
/// `export ` prefix, optional single/double quotes around the value.
/// Lines without `=` are skipped.
fn parse_dotenv(text: &str) -> Vec<(String, String)> {
    let mut vars = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            tracing::warn!(line, "skipping dotenv line without `=`");
            continue;
        };
        let key = key.trim().to_string();
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value);
        vars.push((key, value.to_string()));
    }
    vars
}

#[cfg(test)]
#[path = "startup_script_tests.rs"]
mod tests;
