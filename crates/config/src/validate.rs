// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural invariants checked after normalization, before any spawn.

use crate::error::ConfigError;
use crate::schema::{CommandLine, Document};
use encab_core::MAIN_PROGRAM;

pub fn validate(doc: &Document) -> Result<(), ConfigError> {
    if !doc.programs.is_empty() && !doc.programs.contains_key(MAIN_PROGRAM) {
        return Err(ConfigError::MissingMain);
    }

    for (name, program) in &doc.programs {
        let is_main = name == MAIN_PROGRAM;

        match (&program.command, &program.sh) {
            (Some(_), Some(_)) => return Err(ConfigError::CommandAndSh(name.clone())),
            // `main` may receive its argv from the CLI instead.
            (None, None) if !is_main => return Err(ConfigError::NoCommand(name.clone())),
            _ => {}
        }
        if let Some(CommandLine::Argv(argv)) = &program.command {
            if argv.is_empty() {
                return Err(ConfigError::BadCommand {
                    program: name.clone(),
                    message: "empty argv".to_string(),
                });
            }
        }

        check_non_negative(name, "startup_delay", program.startup_delay)?;
        if let Some(join_time) = program.join_time {
            check_non_negative(name, "join_time", join_time)?;
        }
        if let Some(restart_delay) = program.restart_delay {
            if is_main {
                return Err(ConfigError::MainRestart);
            }
            check_non_negative(name, "restart_delay", restart_delay)?;
        }
        if let Some(umask) = &program.umask {
            umask.bits().map_err(|message| ConfigError::BadUmask {
                value: format!("{umask:?}"),
                message,
            })?;
        }

        // Honored only on main under PID 1; anywhere else it is inert.
        if program.reap_zombies && !is_main {
            tracing::warn!(program = %name, "reap_zombies is only honored on `main`; ignoring");
        }
    }
    Ok(())
}

fn check_non_negative(program: &str, field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value < 0.0 || value.is_nan() {
        return Err(ConfigError::NegativeDuration {
            program: program.to_string(),
            field,
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
