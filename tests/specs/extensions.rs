//! Built-in extensions, end to end.

use crate::prelude::*;
use std::io::Write;

#[test]
fn sanitizer_masks_secret_from_process_environment() {
    let output = encab("programs:\n  main:\n    sh: echo $MY_PASSWORD\n")
        .env("MY_PASSWORD", "s3cR37")
        .output();
    assert_eq!(output.status.code(), Some(0));
    let lines = stdout_lines(&output);
    assert!(lines.contains(&"INFO  main: ******".to_string()), "{lines:#?}");
    assert!(
        !lines.iter().any(|l| l.contains("s3cR37")),
        "secret leaked: {lines:#?}"
    );
}

#[test]
fn sanitizer_extra_patterns_mask_custom_names() {
    let output = encab(
        "extensions:\n  log_sanitizer:\n    settings:\n      extra_patterns: ['*TOKEN*']\nprograms:\n  main:\n    sh: echo $AUTH_TOKEN\n",
    )
    .env("AUTH_TOKEN", "tok-12345-abcde")
    .output();
    let lines = stdout_lines(&output);
    assert!(lines.contains(&"INFO  main: ******".to_string()), "{lines:#?}");
}

#[test]
fn startup_script_loadenv_feeds_children() {
    let run = encab(
        "extensions:\n  startup_script:\n    settings:\n      loadenv: app.env\nprograms:\n  main:\n    sh: echo $LOADED\n",
    );
    let mut file = std::fs::File::create(run.dir().join("app.env")).unwrap();
    writeln!(file, "LOADED=from-dotenv").unwrap();
    drop(file);
    let output = run.output();
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert!(stdout_lines(&output).contains(&"INFO  main: from-dotenv".to_string()));
}

#[test]
fn startup_script_buildenv_feeds_children() {
    let output = encab(
        "extensions:\n  startup_script:\n    settings:\n      buildenv: ['echo BUILT=by-script']\nprograms:\n  main:\n    sh: echo $BUILT\n",
    )
    .output();
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout_lines(&output).contains(&"INFO  main: by-script".to_string()));
}

#[test]
fn startup_script_failure_aborts_startup() {
    let output = encab(
        "extensions:\n  startup_script:\n    settings:\n      buildenv: ['exit 3']\nprograms:\n  main:\n    sh: echo never\n",
    )
    .output();
    assert_eq!(output.status.code(), Some(1));
    let lines = stdout_lines(&output);
    assert!(!lines.iter().any(|l| l.contains("never")), "{lines:#?}");
}

#[test]
fn validation_gates_startup() {
    let output = encab(
        "extensions:\n  validation:\n    settings:\n      variables:\n        ENCAB_SPEC_REQUIRED:\n          required: true\nprograms:\n  main:\n    sh: echo never\n",
    )
    .env_remove("ENCAB_SPEC_REQUIRED")
    .output();
    assert_eq!(output.status.code(), Some(1));
    assert!(!stdout_lines(&output).iter().any(|l| l.contains("never")));
}

#[test]
fn validation_default_reaches_children() {
    let output = encab(
        "extensions:\n  validation:\n    settings:\n      variables:\n        SPEC_WORKERS:\n          default: 4\n          format: int\nprograms:\n  main:\n    sh: echo workers=$SPEC_WORKERS\n",
    )
    .env_remove("SPEC_WORKERS")
    .output();
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert!(stdout_lines(&output).contains(&"INFO  main: workers=4".to_string()));
}

#[test]
fn log_collector_tails_a_file() {
    let output = encab(
        "extensions:\n  log_collector:\n    settings:\n      sources:\n        app:\n          path: app.log\n          poll_ms: 30\nprograms:\n  main:\n    sh: ['sleep 0.1', 'echo from-the-file >> app.log', 'sleep 0.3']\n",
    )
    .output();
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let lines = stdout_lines(&output);
    assert!(
        lines.contains(&"INFO  app: from-the-file".to_string()),
        "{lines:#?}"
    );
}
