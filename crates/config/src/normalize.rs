// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Defaults layering and canonical forms.
//!
//! Normalization rewrites a parsed document into its canonical shape:
//! string commands become argv vectors, single snippets become lists,
//! umasks become numeric, `debug` shortcuts resolve to levels, and
//! program fields left unset inherit the `encab` section's defaults.
//! Normalizing an already-normalized document is a no-op.

use crate::error::ConfigError;
use crate::schema::{CommandLine, Document, Snippets, Umask};
use encab_core::LogLevel;

/// Default `join_time` in seconds when neither the program nor the
/// `encab` section sets one.
pub const DEFAULT_JOIN_TIME: f64 = 1.0;

pub fn normalize(doc: &mut Document) -> Result<(), ConfigError> {
    // Canonical encab-level defaults first: programs inherit from them.
    let encab_level = if doc.encab.debug {
        LogLevel::Debug
    } else {
        doc.encab.loglevel.unwrap_or_default()
    };
    doc.encab.loglevel = Some(encab_level);
    if let Some(umask) = &doc.encab.umask {
        doc.encab.umask = Some(Umask::Bits(canonical_umask(umask)?));
    }

    let encab = doc.encab.clone();
    for (name, program) in doc.programs.iter_mut() {
        if let Some(command) = &program.command {
            let tokens = command.tokens().map_err(|e| ConfigError::BadCommand {
                program: name.clone(),
                message: e.to_string(),
            })?;
            program.command = Some(CommandLine::Argv(tokens));
        }
        if let Some(Snippets::One(snippet)) = &program.sh {
            program.sh = Some(Snippets::Many(vec![snippet.clone()]));
        }

        if program.debug {
            program.loglevel = Some(LogLevel::Debug);
        } else if program.loglevel.is_none() {
            program.loglevel = Some(encab_level);
        }

        if program.join_time.is_none() {
            program.join_time = Some(encab.join_time.unwrap_or(DEFAULT_JOIN_TIME));
        }
        if program.user.is_none() {
            program.user = encab.user.clone();
        }
        if program.group.is_none() {
            program.group = encab.group.clone();
        }
        if program.umask.is_none() {
            program.umask = encab.umask.clone();
        }
        if let Some(umask) = &program.umask {
            program.umask = Some(Umask::Bits(canonical_umask(umask)?));
        }
    }
    Ok(())
}

fn canonical_umask(umask: &Umask) -> Result<u32, ConfigError> {
    umask.bits().map_err(|message| ConfigError::BadUmask {
        value: match umask {
            Umask::Bits(b) => format!("0o{b:o}"),
            Umask::Text(s) => s.clone(),
        },
        message,
    })
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
