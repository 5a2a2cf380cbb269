//! Sequential reader for the whitespace-tokenized legacy text formats.
//!
//! The formats are not self-describing: callers decide from values already
//! read how many lines follow. Lines are consumed exactly once; there is no
//! lookahead and no backtracking.

use crate::domain::{NshmpError, NshmpResult};
use std::fs;
use std::path::Path;

pub fn read_source_text(path: &Path) -> NshmpResult<String> {
    fs::read_to_string(path).map_err(|source| {
        NshmpError::io_system(
            "IO.SOURCE_FILE_READ",
            format!("failed to read source file '{}': {}", path.display(), source),
        )
    })
}

/// Accepts Fortran `D` exponents and stray trailing commas.
fn normalize_numeric_token(token: &str) -> String {
    token
        .trim_end_matches(',')
        .chars()
        .map(|ch| match ch {
            'D' | 'd' => 'E',
            other => other,
        })
        .collect()
}

pub struct LineReader<'a> {
    origin: &'a str,
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    line_number: usize,
}

impl<'a> LineReader<'a> {
    pub fn new(origin: &'a str, text: &'a str) -> Self {
        Self {
            origin,
            lines: text.lines().enumerate(),
            line_number: 0,
        }
    }

    pub fn origin(&self) -> &'a str {
        self.origin
    }

    /// One-based number of the last consumed line.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Next non-blank line, or `None` at end of input.
    pub fn try_next_record(&mut self) -> Option<Record<'a>> {
        for (index, line) in self.lines.by_ref() {
            let tokens: Vec<&'a str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            self.line_number = index + 1;
            return Some(Record {
                origin: self.origin,
                line_number: index + 1,
                tokens,
                cursor: 0,
            });
        }
        None
    }

    /// Next non-blank line; end of input here means the record is incomplete.
    pub fn next_record(&mut self, expected: &str) -> NshmpResult<Record<'a>> {
        self.try_next_record().ok_or_else(|| {
            NshmpError::file_format(
                "FORMAT.UNEXPECTED_EOF",
                format!(
                    "{}: input ended after line {} while reading {}",
                    self.origin, self.line_number, expected
                ),
            )
        })
    }
}

/// Tokens of one line with a read cursor.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    origin: &'a str,
    line_number: usize,
    tokens: Vec<&'a str>,
    cursor: usize,
}

impl<'a> Record<'a> {
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn remaining(&self) -> usize {
        self.tokens.len() - self.cursor
    }

    fn location(&self) -> String {
        format!("{}:{}", self.origin, self.line_number)
    }

    pub fn error(&self, placeholder: &'static str, message: impl std::fmt::Display) -> NshmpError {
        NshmpError::file_format(placeholder, format!("{}: {}", self.location(), message))
    }

    fn next_raw(&mut self, name: &str) -> NshmpResult<&'a str> {
        let token = self.tokens.get(self.cursor).copied().ok_or_else(|| {
            self.error(
                "FORMAT.MISSING_TOKEN",
                format!(
                    "expected {} at token {} but the line has {} tokens",
                    name,
                    self.cursor + 1,
                    self.tokens.len()
                ),
            )
        })?;
        self.cursor += 1;
        Ok(token)
    }

    pub fn next_f64(&mut self, name: &str) -> NshmpResult<f64> {
        let token = self.next_raw(name)?;
        normalize_numeric_token(token)
            .parse::<f64>()
            .map_err(|_| self.error("FORMAT.NUMERIC_TOKEN", format!("invalid {name} '{token}'")))
    }

    pub fn next_i32(&mut self, name: &str) -> NshmpResult<i32> {
        let token = self.next_raw(name)?;
        token
            .trim_end_matches(',')
            .parse::<i32>()
            .map_err(|_| self.error("FORMAT.INTEGER_TOKEN", format!("invalid {name} '{token}'")))
    }

    pub fn next_count(&mut self, name: &str) -> NshmpResult<usize> {
        let value = self.next_i32(name)?;
        usize::try_from(value)
            .map_err(|_| self.error("FORMAT.NEGATIVE_COUNT", format!("{name} must be non-negative, got {value}")))
    }

    pub fn next_text(&mut self, name: &str) -> NshmpResult<&'a str> {
        self.next_raw(name)
    }

    /// Remaining tokens joined by single spaces (free-text names).
    pub fn rest_text(&mut self) -> String {
        let rest = self.tokens[self.cursor..].join(" ");
        self.cursor = self.tokens.len();
        rest
    }

    pub fn next_f64_values(&mut self, count: usize, name: &str) -> NshmpResult<Vec<f64>> {
        (0..count).map(|_| self.next_f64(name)).collect()
    }
}
