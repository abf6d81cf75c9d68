// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config file discovery and loading.

use crate::error::ConfigError;
use crate::normalize::normalize;
use crate::schema::Document;
use crate::validate::validate;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file; wins over the search order.
pub const CONFIG_ENV: &str = "ENCAB_CONFIG";

/// Environment variable overriding `encab.dry_run` (`0` or `1`).
pub const DRY_RUN_ENV: &str = "ENCAB_DRY_RUN";

/// Default search order when [`CONFIG_ENV`] is unset. First hit wins.
const SEARCH_PATHS: [&str; 4] = [
    "./encab.yml",
    "./encab.yaml",
    "/etc/encab.yml",
    "/etc/encab.yaml",
];

/// Resolve the config file path.
pub fn discover() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    for candidate in SEARCH_PATHS {
        let path = Path::new(candidate);
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }
    Err(ConfigError::NotFound {
        searched: SEARCH_PATHS.join(", "),
    })
}

/// Parse, normalize, and validate a YAML document.
pub fn parse_str(yaml: &str) -> Result<Document, ConfigError> {
    let mut doc: Document = serde_yaml::from_str(yaml)?;
    normalize(&mut doc)?;
    validate(&doc)?;
    Ok(doc)
}

/// Load a specific config file and apply environment overrides.
pub fn load_path(path: &Path) -> Result<Document, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut doc = parse_str(&text)?;
    apply_dry_run_override(&mut doc)?;
    Ok(doc)
}

/// Discover and load the effective configuration.
pub fn load() -> Result<Document, ConfigError> {
    let path = discover()?;
    tracing::debug!(path = %path.display(), "loading config");
    load_path(&path)
}

fn apply_dry_run_override(doc: &mut Document) -> Result<(), ConfigError> {
    match std::env::var(DRY_RUN_ENV) {
        Ok(value) => match value.as_str() {
            "1" => {
                doc.encab.dry_run = true;
                Ok(())
            }
            "0" => {
                doc.encab.dry_run = false;
                Ok(())
            }
            other => Err(ConfigError::BadEnvOverride {
                name: DRY_RUN_ENV,
                value: other.to_string(),
            }),
        },
        Err(_) => Ok(()),
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
