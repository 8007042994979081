// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Line parser for `outputs = Op(inputs)` programs.
//!
//! The grammar is deliberately loose:
//!
//! ```text
//! line      := loop-mark | operation | blank
//! loop-mark := <any text containing FOR_BEGIN or FOR_END>
//! operation := names '=' opname '(' names ')'
//! names     := name (',' name)*
//! ```
//!
//! Whitespace is ignored inside the name lists. Empty name slots (as in
//! `a = f()`) are dropped.
//!
//! Malformed lines are reported as [`MalformedInput`] values; nothing here
//! aborts. Callers are expected to skip the line and continue.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::operation::{Names, Operation, Statement};

/// Keyword opening a loop body.
pub const LOOP_BEGIN: &str = "FOR_BEGIN";
/// Keyword closing a loop body.
pub const LOOP_END: &str = "FOR_END";

/// Why a line could not be parsed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MalformedInput {
    /// The line has no `=`.
    MissingEquals,
    /// No `(` followed by a `)` after the `=`.
    MissingParentheses,
}

impl fmt::Display for MalformedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEquals => f.write_str("invalid input format: missing '='"),
            Self::MissingParentheses => f.write_str("invalid input format: missing parentheses"),
        }
    }
}

impl core::error::Error for MalformedInput {}

/// Parses a single line.
///
/// Returns `Ok(None)` for blank lines.
///
/// ```
/// use opshuffle::parse::{MalformedInput, parse_line};
/// use opshuffle::Statement;
///
/// let Some(Statement::Op(op)) = parse_line("a, b = split(x)").unwrap() else {
///     panic!("expected an operation");
/// };
/// assert_eq!(op.outputs(), ["a", "b"]);
/// assert_eq!(op.inputs(), ["x"]);
///
/// assert!(matches!(parse_line("  FOR_BEGIN "), Ok(Some(Statement::LoopBegin { .. }))));
/// assert_eq!(parse_line("a f(x)"), Err(MalformedInput::MissingEquals));
/// assert_eq!(parse_line("a = f x"), Err(MalformedInput::MissingParentheses));
/// assert_eq!(parse_line("   "), Ok(None));
/// ```
///
/// # Errors
///
/// [`MalformedInput`] when the line is neither a loop marker nor a well-formed
/// operation.
pub fn parse_line(line: &str) -> Result<Option<Statement>, MalformedInput> {
    let text = line.trim();
    if text.is_empty() {
        return Ok(None);
    }
    if text.contains(LOOP_BEGIN) {
        return Ok(Some(Statement::LoopBegin { text: text.into() }));
    }
    if text.contains(LOOP_END) {
        return Ok(Some(Statement::LoopEnd { text: text.into() }));
    }

    let (lhs, rhs) = text.split_once('=').ok_or(MalformedInput::MissingEquals)?;
    let open = rhs.find('(').ok_or(MalformedInput::MissingParentheses)?;
    let close = rhs.find(')').ok_or(MalformedInput::MissingParentheses)?;
    if open >= close {
        return Err(MalformedInput::MissingParentheses);
    }

    let outputs = split_names(lhs);
    let inputs = split_names(&rhs[open + 1..close]);
    Ok(Some(Statement::Op(Operation::new(inputs, outputs, text))))
}

fn split_names(list: &str) -> Names {
    list.split(',')
        .map(|slot| slot.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|name| !name.is_empty())
        .collect()
}

/// A line [`parse_program`] had to skip.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SkippedLine {
    /// One-based line number.
    pub line_number: usize,
    /// What was wrong with it.
    pub error: MalformedInput,
}

/// Result of parsing a whole program.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedProgram {
    /// Statements in source order.
    pub statements: Vec<Statement>,
    /// Malformed lines, in source order.
    pub skipped: Vec<SkippedLine>,
}

/// Parses every line of `source`, skipping malformed ones.
///
/// ```
/// use opshuffle::parse::{MalformedInput, parse_program};
///
/// let parsed = parse_program("a = f(x)\n\nbogus\nFOR_BEGIN\nFOR_END\n");
/// assert_eq!(parsed.statements.len(), 3);
/// assert_eq!(parsed.skipped.len(), 1);
/// assert_eq!(parsed.skipped[0].line_number, 3);
/// assert_eq!(parsed.skipped[0].error, MalformedInput::MissingEquals);
/// ```
#[must_use]
pub fn parse_program(source: &str) -> ParsedProgram {
    let mut program = ParsedProgram::default();
    for (index, line) in source.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(statement)) => program.statements.push(statement),
            Ok(None) => {}
            Err(error) => program.skipped.push(SkippedLine {
                line_number: index + 1,
                error,
            }),
        }
    }
    program
}
