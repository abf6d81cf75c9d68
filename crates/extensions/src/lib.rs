// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! encab-extensions: optional behavior hooked into supervisor startup.
//!
//! Extensions implement the [`Extension`] hook contract and are looked up
//! in a build-time registry — there is no dynamic module loading. Each
//! hook may be a no-op; the host drives them in a fixed order:
//! `validate` → `configure` → `update_environment` → `update_config` →
//! `extend`.

pub mod api;
pub mod collector;
pub mod sanitizer;
pub mod startup_script;
pub mod validation;

pub use api::{Extension, ExtensionError, ExtensionTasks, Settings};
pub use collector::LogCollector;
pub use sanitizer::LogSanitizer;
pub use startup_script::StartupScript;
pub use validation::Validation;

/// All built-in extensions, in host invocation order.
pub fn builtin_extensions() -> Vec<Box<dyn Extension>> {
    vec![
        Box::new(LogSanitizer::new()),
        Box::new(StartupScript::new()),
        Box::new(Validation::new()),
        Box::new(LogCollector::new()),
    ]
}
