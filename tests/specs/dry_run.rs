//! Dry-run mode: validation without side effects.

use crate::prelude::*;

#[test]
fn dry_run_validates_and_exits_zero() {
    let output = encab(
        "encab:\n  dry_run: true\nprograms:\n  main:\n    sh: echo side-effect\n",
    )
    .output();
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout_lines(&output),
        [
            "INFO  log_sanitizer: settings are valid.",
            "INFO  encab: settings are valid.",
            "INFO  encab: Dry run succeeded. Exiting.",
        ]
    );
}

#[test]
fn dry_run_reports_every_enabled_extension() {
    let output = encab(
        "encab:\n  dry_run: true\nextensions:\n  startup_script: {}\n  validation: {}\nprograms:\n  main:\n    sh: 'true'\n",
    )
    .output();
    assert_eq!(output.status.code(), Some(0));
    let lines = stdout_lines(&output);
    for ext in ["log_sanitizer", "startup_script", "validation"] {
        assert!(
            lines.contains(&format!("INFO  {ext}: settings are valid.")),
            "{lines:#?}"
        );
    }
    assert_eq!(
        lines.last().unwrap(),
        "INFO  encab: Dry run succeeded. Exiting."
    );
}

#[test]
fn dry_run_spawns_no_program() {
    let run = encab(
        "encab:\n  dry_run: true\nprograms:\n  main:\n    sh: touch marker-file\n",
    );
    let marker = run.dir().join("marker-file");
    let output = run.output();
    assert_eq!(output.status.code(), Some(0));
    assert!(!marker.exists(), "dry run must not spawn programs");
}

#[test]
fn encab_dry_run_env_forces_dry_run() {
    let run = encab("programs:\n  main:\n    sh: touch marker-file\n").env("ENCAB_DRY_RUN", "1");
    let marker = run.dir().join("marker-file");
    let output = run.output();
    assert_eq!(output.status.code(), Some(0));
    assert!(!marker.exists());
    assert!(stdout_lines(&output)
        .contains(&"INFO  encab: Dry run succeeded. Exiting.".to_string()));
}

#[test]
fn encab_dry_run_zero_overrides_config() {
    let output = encab("encab:\n  dry_run: true\nprograms:\n  main:\n    sh: echo ran\n")
        .env("ENCAB_DRY_RUN", "0")
        .output();
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout_lines(&output).contains(&"INFO  main: ran".to_string()));
}

#[test]
fn invalid_encab_dry_run_value_fails() {
    let output = encab("programs:\n  main:\n    sh: 'true'\n")
        .env("ENCAB_DRY_RUN", "yes")
        .output();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_text(&output).contains("ENCAB_DRY_RUN"));
}
