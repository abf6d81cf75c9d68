// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Printf-style rendering of log records.
//!
//! The `logformat` config value is a printf-like template whose string
//! directives are applied positionally to the record fields
//! `level, program, message`. Only the `s` conversion is supported, with
//! optional left-align flag, field width, and precision
//! (e.g. the default `"%-5.5s %s: %s"` pads/truncates the level to five
//! characters). Directives beyond the third render as empty strings.

use crate::record::LogRecord;

/// Default record template: padded level, program tag, message.
pub const DEFAULT_LOGFORMAT: &str = "%-5.5s %s: %s";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field {
        left_align: bool,
        width: Option<usize>,
        precision: Option<usize>,
    },
}

/// A parsed `logformat` template.
#[derive(Debug, Clone)]
pub struct LogFormat {
    segments: Vec<Segment>,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::parse(DEFAULT_LOGFORMAT)
    }
}

impl LogFormat {
    /// Parse a template. Malformed directives are kept as literal text, so
    /// parsing never fails; a bad format degrades to visible garbage rather
    /// than lost records.
    pub fn parse(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                literal.push('%');
                continue;
            }

            // Scan flag, width, precision, conversion.
            let mut directive = String::from('%');
            let mut left_align = false;
            if chars.peek() == Some(&'-') {
                left_align = true;
                directive.push('-');
                chars.next();
            }
            let mut width = String::new();
            while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                width.push(*d);
                directive.push(*d);
                chars.next();
            }
            let mut precision = String::new();
            if chars.peek() == Some(&'.') {
                directive.push('.');
                chars.next();
                while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    precision.push(*d);
                    directive.push(*d);
                    chars.next();
                }
            }
            match chars.next() {
                Some('s') => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field {
                        left_align,
                        width: width.parse().ok(),
                        precision: precision.parse().ok(),
                    });
                }
                Some(other) => {
                    literal.push_str(&directive);
                    literal.push(other);
                }
                None => literal.push_str(&directive),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Self { segments }
    }

    /// Render a record's level/program/message through the template.
    pub fn render(&self, record: &LogRecord) -> String {
        self.render_fields(
            record.level.as_str(),
            &record.program,
            &record.message,
        )
    }

    fn render_fields(&self, level: &str, program: &str, message: &str) -> String {
        let fields = [level, program, message];
        let mut next = 0usize;
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field {
                    left_align,
                    width,
                    precision,
                } => {
                    let value = fields.get(next).copied().unwrap_or("");
                    next += 1;
                    let truncated = match precision {
                        Some(p) if value.len() > *p => {
                            // Truncate on a char boundary at or below the cap.
                            let mut end = *p;
                            while end > 0 && !value.is_char_boundary(end) {
                                end -= 1;
                            }
                            &value[..end]
                        }
                        _ => value,
                    };
                    match width {
                        Some(w) if truncated.len() < *w => {
                            if *left_align {
                                out.push_str(truncated);
                                out.extend(std::iter::repeat(' ').take(w - truncated.len()));
                            } else {
                                out.extend(std::iter::repeat(' ').take(w - truncated.len()));
                                out.push_str(truncated);
                            }
                        }
                        _ => out.push_str(truncated),
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
