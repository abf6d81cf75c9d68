// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! validation: declarative constraints on environment variables.
//!
//! Declared variables are checked against the composed environment before
//! any gated program spawns; a failure aborts startup. A constraint may be
//! scoped to one program (`program`) or several (`programs`), in which case
//! the program's own environment layer participates and defaults land
//! there instead of the global layer.

use crate::api::{parse_settings, Extension, ExtensionError, Settings};
use async_trait::async_trait;
use encab_config::schema::EnvValue;
use encab_config::ProgramConfig;
use encab_core::Logger;
use encab_engine::env::ExtensionEnv;
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct ValidationSettings {
    variables: IndexMap<String, VarSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum VarFormat {
    String,
    Float,
    Int,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct VarSpec {
    required: bool,
    format: Option<VarFormat>,
    default: Option<serde_yaml::Value>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    regex: Option<String>,
    /// Scope the check (and any default) to one program.
    program: Option<String>,
    /// Scope the check (and any default) to several programs.
    programs: Option<Vec<String>>,
}

impl VarSpec {
    fn scope(&self) -> Vec<String> {
        match (&self.program, &self.programs) {
            (Some(one), _) => vec![one.clone()],
            (None, Some(many)) => many.clone(),
            (None, None) => Vec::new(),
        }
    }

    fn default_string(&self) -> Option<String> {
        self.default.as_ref().map(yaml_to_string)
    }
}

fn yaml_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim_end()
            .to_string(),
    }
}

pub struct Validation {
    settings: ValidationSettings,
}

impl Validation {
    pub fn new() -> Self {
        Self {
            settings: ValidationSettings::default(),
        }
    }
}

impl Default for Validation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extension for Validation {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn validate(&self, settings: &Settings) -> Result<(), ExtensionError> {
        let parsed: ValidationSettings = parse_settings(settings)?;
        for (name, spec) in &parsed.variables {
            if let Some(pattern) = &spec.regex {
                Regex::new(pattern).map_err(|e| {
                    ExtensionError::Settings(format!("bad regex for `{name}`: {e}"))
                })?;
            }
            if spec.program.is_some() && spec.programs.is_some() {
                return Err(ExtensionError::Settings(format!(
                    "`{name}`: `program` and `programs` are mutually exclusive"
                )));
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

    async fn update_environment(
        &self,
        env: &mut ExtensionEnv,
        programs: &mut IndexMap<String, ProgramConfig>,
        logger: &Logger,
    ) -> Result<(), ExtensionError> {
        for (name, spec) in &self.settings.variables {
            let scope = spec.scope();
            if scope.is_empty() {
                check_global(name, spec, env)?;
            } else {
                for program_name in &scope {
                    let Some(program) = programs.get_mut(program_name) else {
                        return Err(ExtensionError::Settings(format!(
                            "`{name}` is scoped to unknown program `{program_name}`"
                        )));
                    };
                    check_scoped(name, spec, env, program_name, program)?;
                }
            }
            logger.debug("validation", format!("{name} ok"));
        }
        Ok(())
    }
}

fn check_global(
    name: &str,
    spec: &VarSpec,
    env: &mut ExtensionEnv,
) -> Result<(), ExtensionError> {
    let current = env
        .get(name)
        .cloned()
        .or_else(|| std::env::var(name).ok());
    match current {
        Some(value) => check_value(name, spec, &value),
        None => match spec.default_string() {
            Some(default) => {
                check_value(name, spec, &default)?;
                env.insert(name.to_string(), default);
                Ok(())
            }
            None if spec.required => Err(missing(name)),
            None => Ok(()),
        },
    }
}

fn check_scoped(
    name: &str,
    spec: &VarSpec,
    env: &ExtensionEnv,
    program_name: &str,
    program: &mut ProgramConfig,
) -> Result<(), ExtensionError> {
    let current = program
        .environment
        .get(name)
        .and_then(|v| v.as_ref().map(EnvValue::to_env_string))
        .or_else(|| env.get(name).cloned())
        .or_else(|| std::env::var(name).ok());
    match current {
        Some(value) => check_value(name, spec, &value).map_err(|e| scope_error(e, program_name)),
        None => match spec.default_string() {
            Some(default) => {
                check_value(name, spec, &default).map_err(|e| scope_error(e, program_name))?;
                program
                    .environment
                    .insert(name.to_string(), Some(EnvValue::String(default)));
                Ok(())
            }
            None if spec.required => Err(scope_error(missing(name), program_name)),
            None => Ok(()),
        },
    }
}

fn scope_error(err: ExtensionError, program: &str) -> ExtensionError {
    match err {
        ExtensionError::Validation { variable, message } => ExtensionError::Validation {
            variable,
            message: format!("{message} (program `{program}`)"),
        },
        other => other,
    }
}

fn missing(name: &str) -> ExtensionError {
    ExtensionError::Validation {
        variable: name.to_string(),
        message: "required but not set".to_string(),
    }
}

fn check_value(name: &str, spec: &VarSpec, value: &str) -> Result<(), ExtensionError> {
    let fail = |message: String| ExtensionError::Validation {
        variable: name.to_string(),
        message,
    };

    let numeric: Option<f64> = match spec.format {
        Some(VarFormat::Int) => Some(
            value
                .parse::<i64>()
                .map_err(|_| fail(format!("`{value}` is not an integer")))? as f64,
        ),
        Some(VarFormat::Float) => Some(
            value
                .parse::<f64>()
                .map_err(|_| fail(format!("`{value}` is not a number")))?,
        ),
        Some(VarFormat::String) | None => {
            // min/max_value still apply when the value happens to parse.
            if spec.min_value.is_some() || spec.max_value.is_some() {
                Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| fail(format!("`{value}` is not a number")))?,
                )
            } else {
                None
            }
        }
    };

    if let Some(min) = spec.min_length {
        if value.chars().count() < min {
            return Err(fail(format!("shorter than {min} characters")));
        }
    }
    if let Some(max) = spec.max_length {
        if value.chars().count() > max {
            return Err(fail(format!("longer than {max} characters")));
        }
    }
    if let Some(n) = numeric {
        if let Some(min) = spec.min_value {
            if n < min {
                return Err(fail(format!("{n} is below the minimum {min}")));
            }
        }
        if let Some(max) = spec.max_value {
            if n > max {
                return Err(fail(format!("{n} is above the maximum {max}")));
            }
        }
    }
    if let Some(pattern) = &spec.regex {
        let re = Regex::new(pattern)
            .map_err(|e| ExtensionError::Settings(format!("bad regex for `{name}`: {e}")))?;
        if !re.is_match(value) {
            return Err(fail(format!("`{value}` does not match `{pattern}`")));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
