// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! encab-config: YAML configuration for the encab supervisor.
//!
//! The document has three top-level sections: `encab` (global settings and
//! per-program defaults), `extensions` (per-extension enable/settings), and
//! `programs` (the supervised programs, in declared order). Loading runs
//! parse → normalize → validate; the normalized document is immutable once
//! the supervisor starts.

pub mod argv;
pub mod error;
pub mod normalize;
pub mod schema;
pub mod source;
pub mod validate;

pub use argv::split_command_line;
pub use error::ConfigError;
pub use normalize::normalize;
pub use schema::{
    CommandLine, Document, EncabConfig, EnvMap, ExtensionConfig, GroupRef, ProgramConfig,
    Snippets, Umask, UserRef,
};
pub use source::{discover, load, load_path, parse_str, CONFIG_ENV, DRY_RUN_ENV};
pub use validate::validate;
