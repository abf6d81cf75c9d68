//! Program lifecycle: startup order, exit-code mapping, restarts.

use crate::prelude::*;

#[test]
fn single_main_echoes_and_exits() {
    let output = encab("programs:\n  main:\n    sh: ['echo \"Hello Encab!\"']\n").output();
    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        stdout_lines(&output),
        [
            "INFO  encab: starting…",
            "INFO  main: Hello Encab!",
            "INFO  main: Exited with rc: 0",
        ]
    );
}

#[test]
fn helper_starts_before_main_and_stops_after() {
    let output = encab(
        "programs:\n  sleep:\n    command: sleep 30\n  main:\n    command: /bin/true\n",
    )
    .output();
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let lines = stdout_lines(&output);
    let main_exit = line_index(&lines, "INFO  main: Exited with rc: 0");
    let helper_term = line_index(&lines, "INFO  sleep: Terminated by signal 15");
    assert!(helper_term > main_exit, "{lines:#?}");
}

#[test]
fn main_exit_code_is_the_process_exit_code() {
    let output = encab("programs:\n  main:\n    sh: exit 4\n").output();
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn signalled_main_exits_128_plus_signo() {
    let output = encab("programs:\n  main:\n    sh: kill -9 $$\n").output();
    assert_eq!(output.status.code(), Some(137));
}

#[test]
fn helper_exit_never_becomes_the_exit_code() {
    let output = encab(
        "programs:\n  helper:\n    sh: exit 9\n  main:\n    sh: ['sleep 0.2', 'exit 0']\n",
    )
    .output();
    assert_eq!(output.status.code(), Some(0), "{output:?}");
}

#[test]
fn helper_spawn_failure_aborts_startup() {
    let output = encab(
        "programs:\n  broken:\n    command: /nonexistent/encab-helper-bin\n  main:\n    sh: echo never\n",
    )
    .output();
    assert_eq!(output.status.code(), Some(1));
    let lines = stdout_lines(&output);
    assert!(!lines.iter().any(|l| l.contains("never")), "{lines:#?}");
}

#[test]
fn helper_with_restart_delay_restarts() {
    let output = encab(
        "programs:\n  flaky:\n    sh: exit 1\n    restart_delay: 0.05\n  main:\n    sh: sleep 0.5\n",
    )
    .output();
    assert_eq!(output.status.code(), Some(0));
    let restarts = stdout_lines(&output)
        .iter()
        .filter(|l| *l == "ERROR flaky: Exited with rc: 1")
        .count();
    assert!(restarts >= 2, "{output:?}");
}

#[test]
fn startup_delay_defers_spawn() {
    let output = encab(
        "programs:\n  main:\n    sh: echo delayed\n    startup_delay: 0.2\n",
    )
    .output();
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout_lines(&output).contains(&"INFO  main: delayed".to_string()));
}

#[test]
fn stderr_lines_are_tagged_error() {
    let output = encab("programs:\n  main:\n    sh: echo oops >&2\n").output();
    let lines = stdout_lines(&output);
    assert!(
        lines.contains(&"ERROR main: oops".to_string()),
        "{lines:#?}"
    );
}

#[test]
fn multi_line_output_is_one_record_per_line() {
    let output = encab("programs:\n  main:\n    sh: printf 'a\\nb\\nc\\n'\n").output();
    let lines = stdout_lines(&output);
    let payload: Vec<&String> = lines
        .iter()
        .filter(|l| l.starts_with("INFO  main: ") && !l.contains("Exited"))
        .collect();
    assert_eq!(payload, ["INFO  main: a", "INFO  main: b", "INFO  main: c"]);
}

#[test]
fn output_without_trailing_newline_is_flushed() {
    let output = encab("programs:\n  main:\n    sh: printf 'no newline'\n").output();
    let lines = stdout_lines(&output);
    assert!(
        lines.contains(&"INFO  main: no newline".to_string()),
        "{lines:#?}"
    );
}
