// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! encab: container-aware process supervisor.
//!
//! Runs as the container entrypoint (usually PID 1), starts the
//! configured helper programs in declared order, runs `main` (whose argv
//! the command line may override), multiplexes all child output into one
//! tagged stream on stdout, and tears down in reverse order on exit or
//! signal.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use encab_core::Logger;

#[tokio::main]
async fn main() {
    // Info flags before any config load. A single leading `--help` or
    // `--version` is ours; anything else is the main program's argv.
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("--version" | "-V") => {
            println!("encab {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        Some("--help" | "-h") => {
            println!("encab {}", env!("CARGO_PKG_VERSION"));
            println!("Container-aware process supervisor");
            println!();
            println!("USAGE:");
            println!("    encab [program-override-argv...]");
            println!();
            println!("Positional arguments replace the `command` of the `main` program.");
            println!();
            println!("ENVIRONMENT:");
            println!("    ENCAB_CONFIG     Path to the config file");
            println!("                     (default search: ./encab.yml, ./encab.yaml,");
            println!("                     /etc/encab.yml, /etc/encab.yaml)");
            println!("    ENCAB_DRY_RUN    0 or 1; overrides encab.dry_run");
            println!("    ENCAB_LOG        Filter for supervisor diagnostics on stderr");
            return;
        }
        _ => {}
    }

    setup_tracing();

    // stdout carries the product log stream; config errors go to stderr.
    let doc = match encab_config::load() {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("encab: {e}");
            std::process::exit(1);
        }
    };

    let (logger, drain) = Logger::new(std::io::stdout());
    let drain_handle = tokio::spawn(drain.run());

    let argv_override = if args.is_empty() { None } else { Some(args) };
    let code = encab_daemon::supervisor::run(doc, argv_override, logger.clone()).await;

    // Closing the last handle lets the drain finish and flush.
    drop(logger);
    match drain_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => eprintln!("encab: log drain failed: {e}"),
        Err(e) => eprintln!("encab: log drain panicked: {e}"),
    }
    std::process::exit(code);
}

/// Supervisor-internal diagnostics go to stderr so stdout stays a clean
/// record stream. Off by default; `ENCAB_LOG=debug` turns them on.
fn setup_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_env("ENCAB_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
