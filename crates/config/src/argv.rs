// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell-style tokenization of string-form `command` values.
//!
//! A `command` given as one string is split into argv tokens with POSIX
//! quoting rules: whitespace separates words, single quotes are literal,
//! double quotes group with backslash escapes, a bare backslash escapes the
//! next character. No expansion of any kind happens here — `$VAR` stays
//! `$VAR`; programs that want a shell use `sh` instead.

use thiserror::Error;

/// Error for a command line whose quoting never closes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("unbalanced quote")]
    UnbalancedQuote,
    #[error("trailing backslash")]
    TrailingBackslash,
}

/// Split a command line into argv tokens.
pub fn split_command_line(line: &str) -> Result<Vec<String>, SplitError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    tokens.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(SplitError::UnbalancedQuote),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            // Inside double quotes a backslash only escapes
                            // these; otherwise it is literal.
                            Some(e @ ('"' | '\\' | '$' | '`')) => current.push(e),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err(SplitError::UnbalancedQuote),
                        },
                        Some(c) => current.push(c),
                        None => return Err(SplitError::UnbalancedQuote),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => current.push(c),
                    None => return Err(SplitError::TrailingBackslash),
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
#[path = "argv_tests.rs"]
mod tests;
