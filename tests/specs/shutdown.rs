//! Signal-driven shutdown and halt_on_exit parking.

use crate::prelude::*;
use nix::sys::signal::Signal;
use serial_test::serial;
use std::time::Duration;

#[test]
#[serial]
fn sigterm_stops_everything_in_reverse_order() {
    let (mut child, _dir) = encab(
        "programs:\n  first:\n    command: sleep 30\n  second:\n    command: sleep 30\n  main:\n    command: sleep 30\n",
    )
    .spawn();

    // Give the supervisor time to bring everything up.
    std::thread::sleep(Duration::from_millis(400));
    send_signal(&child, Signal::SIGTERM);

    assert!(
        wait_until(|| child.try_wait().unwrap().is_some()),
        "supervisor did not exit after SIGTERM"
    );
    let output = child.wait_with_output().unwrap();
    // main was stopped by signal: 128 + 15.
    assert_eq!(output.status.code(), Some(143), "{output:?}");

    let lines = stdout_lines(&output);
    let main_stop = line_index(&lines, "INFO  main: Terminated by signal 15");
    let second_stop = line_index(&lines, "INFO  second: Terminated by signal 15");
    let first_stop = line_index(&lines, "INFO  first: Terminated by signal 15");
    assert!(main_stop < second_stop, "{lines:#?}");
    assert!(second_stop < first_stop, "{lines:#?}");
}

#[test]
#[serial]
fn sigint_requests_the_same_orderly_shutdown() {
    let (mut child, _dir) = encab("programs:\n  main:\n    command: sleep 30\n").spawn();
    std::thread::sleep(Duration::from_millis(300));
    send_signal(&child, Signal::SIGINT);
    assert!(wait_until(|| child.try_wait().unwrap().is_some()));
    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(143));
}

#[test]
#[serial]
fn second_signal_escalates_to_kill() {
    // main ignores SIGTERM; a long join_time would park a single-signal
    // shutdown, so the second signal must cut it short.
    let (mut child, _dir) = encab(
        "programs:\n  main:\n    sh: trap '' TERM; while :; do sleep 0.05; done\n    join_time: 20\n",
    )
    .spawn();
    std::thread::sleep(Duration::from_millis(400));
    send_signal(&child, Signal::SIGTERM);
    std::thread::sleep(Duration::from_millis(200));
    send_signal(&child, Signal::SIGTERM);

    assert!(
        wait_until(|| child.try_wait().unwrap().is_some()),
        "escalation did not kill the stubborn child"
    );
    let output = child.wait_with_output().unwrap();
    // SIGKILL: 128 + 9.
    assert_eq!(output.status.code(), Some(137), "{output:?}");
}

#[test]
#[serial]
fn halt_on_exit_parks_until_a_signal_arrives() {
    let (mut child, _dir) = encab(
        "encab:\n  halt_on_exit: true\nprograms:\n  keeper:\n    command: sleep 30\n  main:\n    sh: exit 2\n",
    )
    .spawn();

    // main exits almost immediately, but the supervisor must stay up.
    std::thread::sleep(Duration::from_millis(700));
    assert!(
        child.try_wait().unwrap().is_none(),
        "supervisor exited despite halt_on_exit"
    );

    send_signal(&child, Signal::SIGTERM);
    assert!(wait_until(|| child.try_wait().unwrap().is_some()));
    let output = child.wait_with_output().unwrap();
    // The parked exit code is still main's.
    assert_eq!(output.status.code(), Some(2), "{output:?}");

    let lines = stdout_lines(&output);
    let main_exit = line_index(&lines, "ERROR main: Exited with rc: 2");
    let keeper_stop = line_index(&lines, "INFO  keeper: Terminated by signal 15");
    assert!(keeper_stop > main_exit, "{lines:#?}");
}

#[test]
#[serial]
fn sighup_behaves_like_sigterm() {
    let (mut child, _dir) = encab("programs:\n  main:\n    command: sleep 30\n").spawn();
    std::thread::sleep(Duration::from_millis(300));
    send_signal(&child, Signal::SIGHUP);
    assert!(wait_until(|| child.try_wait().unwrap().is_some()));
    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(143));
}
