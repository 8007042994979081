// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised by the builder and the scheduler.
//!
//! Every variant is fatal to the call that raised it: no partial graph or
//! partial schedule is ever returned alongside an error.

use alloc::string::String;
use core::fmt;

use crate::operation::OpId;

/// How loop markers failed to pair up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoopImbalance {
    /// A `FOR_END` arrived with no open `FOR_BEGIN`.
    UnmatchedEnd,
    /// Input ended while loops were still open.
    Unclosed {
        /// Number of loops left open.
        open: usize,
    },
}

/// Error returned while building a dependency graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildError {
    /// A variable read before any producer existed is later produced, in the
    /// same scope, by an operation that itself depends on that reader.
    CircularReference {
        /// The variable involved.
        variable: String,
        /// The operation that read `variable` while it had no producer.
        reader: OpId,
        /// The operation producing `variable` downstream of `reader`.
        producer: OpId,
    },
    /// Loop markers are not balanced.
    UnbalancedLoop(LoopImbalance),
    /// Loop nesting went past the configured maximum.
    RecursionLimit {
        /// Depth that was about to be entered.
        depth: usize,
        /// Configured maximum.
        limit: usize,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircularReference {
                variable,
                reader,
                producer,
            } => write!(
                f,
                "circular reference on `{variable}`: {reader} reads it before {producer} produces it, \
                 but {producer} depends on {reader}"
            ),
            Self::UnbalancedLoop(LoopImbalance::UnmatchedEnd) => {
                f.write_str("FOR_END without a matching FOR_BEGIN")
            }
            Self::UnbalancedLoop(LoopImbalance::Unclosed { open }) => {
                write!(f, "input ended with {open} loop(s) still open")
            }
            Self::RecursionLimit { depth, limit } => {
                write!(f, "loop nesting depth {depth} exceeds the limit of {limit}")
            }
        }
    }
}

impl core::error::Error for BuildError {}

/// Error returned while scheduling a graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    /// Some operations never became ready: the graph holds a cycle.
    IncompleteSchedule {
        /// Operations emitted before the wave loop ran dry.
        emitted: usize,
        /// Operations that should have been emitted.
        expected: usize,
    },
    /// Loop nesting went past the configured maximum.
    RecursionLimit {
        /// Depth that was about to be scheduled.
        depth: usize,
        /// Configured maximum.
        limit: usize,
    },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompleteSchedule { emitted, expected } => write!(
                f,
                "only {emitted} of {expected} operations could be scheduled; the rest form a cycle"
            ),
            Self::RecursionLimit { depth, limit } => {
                write!(f, "loop nesting depth {depth} exceeds the limit of {limit}")
            }
        }
    }
}

impl core::error::Error for ScheduleError {}
