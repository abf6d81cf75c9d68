// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use encab_core::test_support::capture_logger;
use encab_config::schema::EnvValue;
use yare::parameterized;

fn settings(yaml: &str) -> Settings {
    serde_yaml::from_str(yaml).unwrap()
}

#[parameterized(
    key_suffix = { "API_KEY" },
    secret_infix = { "MY_SECRET_TOKEN" },
    password = { "MY_PASSWORD" },
    lower_case = { "my_password" },
)]
fn builtin_patterns_match(name: &str) {
    let mut ext = LogSanitizer::new();
    ext.matchers = LogSanitizer::compile(&Settings::Null).unwrap();
    assert!(ext.matches(name), "{name} should match");
}

#[test]
fn unrelated_names_do_not_match() {
    let mut ext = LogSanitizer::new();
    ext.matchers = LogSanitizer::compile(&Settings::Null).unwrap();
    assert!(!ext.matches("HOME"));
    assert!(!ext.matches("PATH"));
}

#[test]
fn extra_patterns_extend_builtins() {
    let mut ext = LogSanitizer::new();
    ext.matchers =
        LogSanitizer::compile(&settings("extra_patterns: ['*TOKEN*']")).unwrap();
    assert!(ext.matches("AUTH_TOKEN"));
    assert!(ext.matches("MY_PASSWORD"));
}

#[test]
fn explicit_patterns_replace_builtins() {
    let mut ext = LogSanitizer::new();
    ext.matchers = LogSanitizer::compile(&settings("patterns: ['*CRED*']")).unwrap();
    assert!(ext.matches("DB_CREDENTIALS"));
    assert!(!ext.matches("MY_PASSWORD"));
}

#[test]
fn question_mark_matches_one_character() {
    let mut ext = LogSanitizer::new();
    ext.matchers = LogSanitizer::compile(&settings("patterns: ['KEY?']")).unwrap();
    assert!(ext.matches("KEY1"));
    assert!(!ext.matches("KEY12"));
    assert!(!ext.matches("KEY"));
}

#[test]
fn validate_rejects_unknown_settings() {
    let ext = LogSanitizer::new();
    let err = ext.validate(&settings("paterns: ['x']")).unwrap_err();
    assert!(matches!(err, ExtensionError::Settings(_)));
}

#[tokio::test]
async fn update_environment_collects_secrets_from_all_layers() {
    let (logger, _drain, _buf) = capture_logger();
    let mut ext = LogSanitizer::new();
    ext.matchers = LogSanitizer::compile(&Settings::Null).unwrap();

    let mut env = ExtensionEnv::new();
    env.insert("SERVICE_KEY".to_string(), "ext-secret".to_string());
    env.insert("PLAIN".to_string(), "visible".to_string());

    let mut programs = IndexMap::new();
    let mut program = ProgramConfig::default();
    program.environment.insert(
        "DB_PASSWORD".to_string(),
        Some(EnvValue::String("prog-secret".to_string())),
    );
    programs.insert("main".to_string(), program);

    ext.update_environment(&mut env, &mut programs, &logger)
        .await
        .unwrap();
    assert_eq!(logger.secret_count(), 2);
}

#[tokio::test]
async fn masked_value_never_reaches_the_stream() {
    let (logger, drain, buf) = capture_logger();
    let handle = tokio::spawn(drain.run());
    let mut ext = LogSanitizer::new();
    ext.matchers = LogSanitizer::compile(&Settings::Null).unwrap();

    let mut env = ExtensionEnv::new();
    env.insert("MY_PASSWORD".to_string(), "s3cR37".to_string());
    let mut programs = IndexMap::new();
    ext.update_environment(&mut env, &mut programs, &logger)
        .await
        .unwrap();

    logger.info("main", "s3cR37");
    drop(logger);
    handle.await.unwrap().unwrap();
    let out = buf.contents();
    assert!(!out.contains("s3cR37"));
    assert!(out.contains("******"));
}
