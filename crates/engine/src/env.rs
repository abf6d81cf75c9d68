// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effective environment composition.
//!
//! Layering, lowest to highest precedence: process environment →
//! `encab.environment` → extension-provided variables → the program's own
//! `environment`. A `null` value in a config layer removes the variable;
//! scalar values are stringified. The result is ordered so repeated runs
//! produce identical child environments.

use encab_config::EnvMap;
use indexmap::IndexMap;

/// Variables contributed by extensions (`update_environment` hook output).
pub type ExtensionEnv = IndexMap<String, String>;

/// Compose the effective environment for one program.
pub fn effective_environment(
    process: impl IntoIterator<Item = (String, String)>,
    encab: &EnvMap,
    extension: &ExtensionEnv,
    program: &EnvMap,
) -> IndexMap<String, String> {
    let mut env: IndexMap<String, String> = process.into_iter().collect();
    apply_config_layer(&mut env, encab);
    for (key, value) in extension {
        env.insert(key.clone(), value.clone());
    }
    apply_config_layer(&mut env, program);
    env
}

fn apply_config_layer(env: &mut IndexMap<String, String>, layer: &EnvMap) {
    for (key, value) in layer {
        match value {
            Some(value) => {
                env.insert(key.clone(), value.to_env_string());
            }
            None => {
                env.shift_remove(key);
            }
        }
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
