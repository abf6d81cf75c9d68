// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::schema::{GroupRef, UserRef};

fn normalized(yaml: &str) -> Document {
    let mut doc: Document = serde_yaml::from_str(yaml).unwrap();
    normalize(&mut doc).unwrap();
    doc
}

#[test]
fn string_command_becomes_argv() {
    let doc = normalized("programs:\n  main:\n    command: echo 'hello world'\n");
    assert_eq!(
        doc.programs["main"].command,
        Some(CommandLine::Argv(vec![
            "echo".to_string(),
            "hello world".to_string()
        ]))
    );
}

#[test]
fn single_snippet_becomes_list() {
    let doc = normalized("programs:\n  main:\n    sh: echo hi\n");
    assert_eq!(
        doc.programs["main"].sh,
        Some(Snippets::Many(vec!["echo hi".to_string()]))
    );
}

#[test]
fn join_time_defaults_to_one_second() {
    let doc = normalized("programs:\n  main:\n    sh: 'true'\n");
    assert_eq!(doc.programs["main"].join_time, Some(DEFAULT_JOIN_TIME));
}

#[test]
fn encab_join_time_flows_to_programs() {
    let doc = normalized("encab:\n  join_time: 2.5\nprograms:\n  main:\n    sh: 'true'\n");
    assert_eq!(doc.programs["main"].join_time, Some(2.5));
}

#[test]
fn program_join_time_wins_over_encab() {
    let doc = normalized(
        "encab:\n  join_time: 2.5\nprograms:\n  main:\n    sh: 'true'\n    join_time: 0.5\n",
    );
    assert_eq!(doc.programs["main"].join_time, Some(0.5));
}

#[test]
fn debug_shortcut_resolves_to_debug_level() {
    let doc = normalized("programs:\n  main:\n    sh: 'true'\n    debug: true\n");
    assert_eq!(doc.programs["main"].loglevel, Some(LogLevel::Debug));
}

#[test]
fn loglevel_inherits_from_encab() {
    let doc = normalized("encab:\n  loglevel: WARNING\nprograms:\n  main:\n    sh: 'true'\n");
    assert_eq!(doc.programs["main"].loglevel, Some(LogLevel::Warning));
}

#[test]
fn encab_debug_flows_to_programs() {
    let doc = normalized("encab:\n  debug: true\nprograms:\n  main:\n    sh: 'true'\n");
    assert_eq!(doc.encab.loglevel, Some(LogLevel::Debug));
    assert_eq!(doc.programs["main"].loglevel, Some(LogLevel::Debug));
}

#[test]
fn user_group_umask_inherit_from_encab() {
    let doc = normalized(
        "encab:\n  user: 1000\n  group: staff\n  umask: '027'\nprograms:\n  main:\n    sh: 'true'\n",
    );
    let main = &doc.programs["main"];
    assert_eq!(main.user, Some(UserRef::Id(1000)));
    assert_eq!(main.group, Some(GroupRef::Name("staff".into())));
    assert_eq!(main.umask, Some(Umask::Bits(0o27)));
}

#[test]
fn bad_umask_is_reported() {
    let mut doc: Document =
        serde_yaml::from_str("programs:\n  main:\n    sh: 'true'\n    umask: 'not-octal'\n")
            .unwrap();
    let err = normalize(&mut doc).unwrap_err();
    assert!(matches!(err, ConfigError::BadUmask { .. }));
}

#[test]
fn unbalanced_command_is_reported() {
    let mut doc: Document =
        serde_yaml::from_str("programs:\n  main:\n    command: \"echo 'oops\"\n").unwrap();
    let err = normalize(&mut doc).unwrap_err();
    assert!(matches!(err, ConfigError::BadCommand { .. }));
}

#[test]
fn normalization_is_idempotent() {
    let yaml = "encab:\n  debug: true\n  umask: '022'\n  join_time: 3.0\nprograms:\n  helper:\n    command: sleep 5\n    restart_delay: 1\n  main:\n    sh: echo hi\n    loglevel: ERROR\n";
    let mut doc: Document = serde_yaml::from_str(yaml).unwrap();
    normalize(&mut doc).unwrap();
    let once = doc.clone();
    normalize(&mut doc).unwrap();
    assert_eq!(doc, once);
}
