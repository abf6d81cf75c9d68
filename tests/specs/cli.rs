//! CLI surface: argv override, info flags, config discovery.

use crate::prelude::*;

#[test]
fn positional_args_override_main_command() {
    let output = encab("programs:\n  main:\n    command: echo \"original\"\n")
        .args(&["echo", "override"])
        .output();
    assert_eq!(output.status.code(), Some(0));
    let lines = stdout_lines(&output);
    assert!(lines.contains(&"INFO  main: override".to_string()), "{lines:#?}");
    assert!(!lines.iter().any(|l| l.contains("original")), "{lines:#?}");
}

#[test]
fn main_without_command_uses_cli_argv() {
    let output = encab("programs:\n  main: {}\n")
        .args(&["echo", "from-cli"])
        .output();
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout_lines(&output).contains(&"INFO  main: from-cli".to_string()));
}

#[test]
fn version_flag_short_circuits() {
    let output = encab_without_config().args(&["--version"]).output();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("encab "));
}

#[test]
fn help_flag_short_circuits() {
    let output = encab_without_config().args(&["--help"]).output();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("ENCAB_CONFIG"), "{text}");
}

#[test]
fn missing_config_exits_1_with_search_paths() {
    let output = encab_without_config().output();
    assert_eq!(output.status.code(), Some(1));
    let err = stderr_text(&output);
    assert!(err.contains("encab.yml"), "{err}");
}

#[test]
fn config_is_discovered_in_cwd_without_encab_config() {
    let run = encab("programs:\n  main:\n    sh: echo discovered\n").env_remove("ENCAB_CONFIG");
    // The config file sits in the run's cwd as ./encab.yml.
    let output = run.output();
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert!(stdout_lines(&output).contains(&"INFO  main: discovered".to_string()));
}

#[test]
fn command_and_sh_together_fail_validation() {
    let output = encab(
        "programs:\n  main:\n    command: echo hi\n    sh: echo hi\n",
    )
    .output();
    assert_eq!(output.status.code(), Some(1));
    let err = stderr_text(&output);
    assert!(err.contains("mutually exclusive"), "{err}");
}

#[test]
fn missing_main_fails_validation() {
    let output = encab("programs:\n  helper:\n    sh: 'true'\n").output();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_text(&output).contains("main"));
}

#[test]
fn malformed_yaml_fails_cleanly() {
    let output = encab("programs: [this is not\n").output();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_text(&output).contains("parse"), "{output:?}");
}

#[test]
fn unknown_program_field_is_rejected() {
    let output = encab("programs:\n  main:\n    comand: echo hi\n").output();
    assert_eq!(output.status.code(), Some(1));
}
