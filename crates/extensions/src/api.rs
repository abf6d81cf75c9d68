// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The extension hook contract.

use async_trait::async_trait;
use encab_config::{Document, ProgramConfig};
use encab_core::Logger;
use encab_engine::env::ExtensionEnv;
use indexmap::IndexMap;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Opaque settings block from the config file, passed through untouched.
pub type Settings = serde_yaml::Value;

/// Failures reported by extension hooks.
///
/// The host decides the consequence: an explicitly-enabled extension
/// aborts startup, a default-enabled one is disabled with a WARNING.
#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("external extension modules are not supported (module `{0}`)")]
    ExternalModule(String),

    #[error("validation failed for `{variable}`: {message}")]
    Validation { variable: String, message: String },

    #[error("startup script failed: {0}")]
    Script(String),

    #[error("{0}")]
    Failed(String),
}

/// Registrar for long-running extension tasks started alongside helpers.
///
/// Tasks receive a shutdown signal receiver; the supervisor flips it at
/// teardown and then awaits (or abandons) the registered handles.
pub struct ExtensionTasks {
    shutdown: watch::Receiver<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl ExtensionTasks {
    pub fn new(shutdown: watch::Receiver<bool>) -> Self {
        Self {
            shutdown,
            handles: Vec::new(),
        }
    }

    /// Shutdown signal for a task about to be spawned.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.clone()
    }

    /// Track a spawned task for teardown.
    pub fn register(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    pub fn into_handles(self) -> Vec<JoinHandle<()>> {
        self.handles
    }
}

/// Decode a settings block, treating an absent/null block as defaults.
pub fn parse_settings<T>(settings: &Settings) -> Result<T, ExtensionError>
where
    T: serde::de::DeserializeOwned + Default,
{
    if settings.is_null() {
        return Ok(T::default());
    }
    serde_yaml::from_value(settings.clone()).map_err(|e| ExtensionError::Settings(e.to_string()))
}

/// Hook contract for one extension. All hooks default to no-ops.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Registry name, as used in the `extensions` config section.
    fn name(&self) -> &'static str;

    /// Whether the extension runs at all.
    ///
    /// `configured` is true when the config file mentions the extension;
    /// mentioning an extension activates it unless `enabled: false` is
    /// set. The sanitizer is the one extension that is active even when
    /// never mentioned.
    fn default_enabled(&self, configured: bool) -> bool {
        configured
    }

    /// Called during config validation, before anything runs.
    fn validate(&self, _settings: &Settings) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Called once between validation and environment building. The
    /// extension may keep state from its settings and emit records.
    async fn configure(
        &mut self,
        _settings: &Settings,
        _logger: &Logger,
    ) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Called once before any child is spawned. May add to the extension
    /// environment layer and mutate per-program environments. Must be
    /// deterministic given its inputs.
    async fn update_environment(
        &self,
        _env: &mut ExtensionEnv,
        _programs: &mut IndexMap<String, ProgramConfig>,
        _logger: &Logger,
    ) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Last chance to mutate the effective configuration.
    fn update_config(&self, _doc: &mut Document) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Register long-running tasks that start alongside helpers.
    fn extend(&self, _tasks: &mut ExtensionTasks, _logger: &Logger) -> Result<(), ExtensionError> {
        Ok(())
    }
}
