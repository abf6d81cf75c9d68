// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extension host: discovery and hook driving.
//!
//! Built-ins come from the build-time registry; a config entry with a
//! `module` identifier is rejected outright (no dynamic loading). Hook
//! failures follow the enable policy: an explicitly-enabled extension
//! aborts startup, a default-enabled one is disabled with a WARNING and
//! startup continues.

use encab_config::{Document, ProgramConfig};
use encab_core::{Logger, SUPERVISOR_PROGRAM};
use encab_engine::env::ExtensionEnv;
use encab_extensions::{builtin_extensions, Extension, ExtensionError, ExtensionTasks, Settings};
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("unknown extension `{0}`")]
    Unknown(String),

    #[error("extension `{name}`: {source}")]
    Extension {
        name: String,
        #[source]
        source: ExtensionError,
    },
}

struct ActiveExtension {
    ext: Box<dyn Extension>,
    settings: Settings,
    /// `enabled: true` in the config; failures abort startup.
    explicit: bool,
    /// Flipped when a default-enabled extension's hook fails.
    disabled: bool,
}

/// The set of active extensions, driven through their hooks in order.
pub struct ExtensionHost {
    active: Vec<ActiveExtension>,
}

impl std::fmt::Debug for ExtensionHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionHost")
            .field("active", &self.active.iter().map(|a| a.ext.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl ExtensionHost {
    /// Resolve the registry against the config's `extensions` section.
    pub fn discover(doc: &Document) -> Result<Self, HostError> {
        let registry = builtin_extensions();

        for (name, config) in &doc.extensions {
            if let Some(module) = &config.module {
                return Err(HostError::Extension {
                    name: name.clone(),
                    source: ExtensionError::ExternalModule(module.clone()),
                });
            }
            if !registry.iter().any(|ext| ext.name() == name) {
                return Err(HostError::Unknown(name.clone()));
            }
        }

        let mut active = Vec::new();
        for ext in registry {
            let config = doc.extensions.get(ext.name());
            let configured = config.is_some();
            let enabled = config
                .and_then(|c| c.enabled)
                .unwrap_or_else(|| ext.default_enabled(configured));
            if !enabled {
                continue;
            }
            active.push(ActiveExtension {
                settings: config
                    .map(|c| c.settings.clone())
                    .unwrap_or(Settings::Null),
                // Mentioning an extension in the config is explicit intent:
                // its failures abort startup. Only an extension running
                // purely by default (the sanitizer) degrades instead.
                explicit: configured,
                disabled: false,
                ext,
            });
        }
        Ok(Self { active })
    }

    /// Names of extensions still active, in invocation order.
    pub fn names(&self) -> Vec<&'static str> {
        self.active
            .iter()
            .filter(|a| !a.disabled)
            .map(|a| a.ext.name())
            .collect()
    }

    /// `validate_extension` hook for every active extension.
    pub fn validate_all(&mut self, logger: &Logger) -> Result<(), HostError> {
        for index in 0..self.active.len() {
            let result = {
                let active = &self.active[index];
                if active.disabled {
                    continue;
                }
                active.ext.validate(&active.settings)
            };
            if let Err(e) = result {
                self.fail(index, e, logger)?;
            }
        }
        Ok(())
    }

    /// `configure` hook for every active extension.
    pub async fn configure_all(&mut self, logger: &Logger) -> Result<(), HostError> {
        for index in 0..self.active.len() {
            let result = {
                let active = &mut self.active[index];
                if active.disabled {
                    continue;
                }
                let settings = active.settings.clone();
                active.ext.configure(&settings, logger).await
            };
            if let Err(e) = result {
                self.fail(index, e, logger)?;
            }
        }
        Ok(())
    }

    /// `update_environment` hook, before any spawn.
    pub async fn update_environment_all(
        &mut self,
        env: &mut ExtensionEnv,
        programs: &mut IndexMap<String, ProgramConfig>,
        logger: &Logger,
    ) -> Result<(), HostError> {
        for index in 0..self.active.len() {
            let result = {
                let active = &self.active[index];
                if active.disabled {
                    continue;
                }
                active.ext.update_environment(env, programs, logger).await
            };
            if let Err(e) = result {
                self.fail(index, e, logger)?;
            }
        }
        Ok(())
    }

    /// `update_config` hook: last chance to mutate the effective config.
    pub fn update_config_all(
        &mut self,
        doc: &mut Document,
        logger: &Logger,
    ) -> Result<(), HostError> {
        for index in 0..self.active.len() {
            let result = {
                let active = &self.active[index];
                if active.disabled {
                    continue;
                }
                active.ext.update_config(doc)
            };
            if let Err(e) = result {
                self.fail(index, e, logger)?;
            }
        }
        Ok(())
    }

    /// `extend` hook: register long-running tasks.
    pub fn extend_all(
        &mut self,
        tasks: &mut ExtensionTasks,
        logger: &Logger,
    ) -> Result<(), HostError> {
        for index in 0..self.active.len() {
            let result = {
                let active = &self.active[index];
                if active.disabled {
                    continue;
                }
                active.ext.extend(tasks, logger)
            };
            if let Err(e) = result {
                self.fail(index, e, logger)?;
            }
        }
        Ok(())
    }

    /// Apply the failure policy for one extension.
    fn fail(
        &mut self,
        index: usize,
        error: ExtensionError,
        logger: &Logger,
    ) -> Result<(), HostError> {
        let active = &mut self.active[index];
        let name = active.ext.name();
        if active.explicit {
            return Err(HostError::Extension {
                name: name.to_string(),
                source: error,
            });
        }
        active.disabled = true;
        logger.warning(
            SUPERVISOR_PROGRAM,
            format!("extension {name} disabled: {error}"),
        );
        tracing::warn!(extension = name, error = %error, "default-enabled extension disabled");
        Ok(())
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
