// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Operation records and graph node identifiers.
//!
//! An [`Operation`] is what the parser produces for one `outputs = Op(inputs)`
//! line. It carries no identity of its own: the [`OpId`] is handed out by the
//! [`GraphBuilder`](crate::GraphBuilder) when the operation is admitted, so ids
//! always follow admission order.

use alloc::string::String;
use core::fmt;

use smallvec::SmallVec;

/// Inline storage for the variable names of one operation.
///
/// Most operations read and write a handful of variables, so the names stay
/// inline until the fifth entry.
pub type Names = SmallVec<[String; 4]>;

/// Identifier of a node admitted into a [`Graph`](crate::Graph).
///
/// Ids are dense, start at zero, and are never reused within one graph.
///
/// # Example
///
/// ```rust
/// use opshuffle::OpId;
///
/// let id = OpId::new(3);
/// assert_eq!(id.index(), 3);
/// assert_eq!(id.to_string(), "#3");
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpId(u32);

impl OpId {
    /// Creates an id from its raw index.
    ///
    /// Ids are normally produced by the builder rather than constructed directly.
    #[must_use]
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns this id as a `usize` index into per-node tables.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw numeric id.
    #[must_use]
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpId").field(&self.0).finish()
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One single-assignment operation: `outputs = Op(inputs)`.
///
/// The record is immutable once built. `text` is the original expression and
/// is what the scheduler emits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Operation {
    inputs: Names,
    outputs: Names,
    text: String,
}

impl Operation {
    /// Creates an operation from its input names, output names and source text.
    ///
    /// ```rust
    /// use opshuffle::Operation;
    ///
    /// let op = Operation::new(["c", "d"], ["a"], "a = f(c, d)");
    /// assert_eq!(op.inputs(), ["c", "d"]);
    /// assert_eq!(op.outputs(), ["a"]);
    /// assert_eq!(op.text(), "a = f(c, d)");
    /// ```
    #[must_use]
    pub fn new<I, O>(inputs: I, outputs: O, text: impl Into<String>) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
            text: text.into(),
        }
    }

    /// Creates a loop boundary record: no inputs, no outputs, just text.
    #[must_use]
    pub(crate) fn marker(text: impl Into<String>) -> Self {
        Self {
            inputs: Names::new(),
            outputs: Names::new(),
            text: text.into(),
        }
    }

    /// Variables read by this operation, in source order.
    #[must_use]
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Variables written by this operation, in source order.
    #[must_use]
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// The original expression text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes the operation and returns its original expression text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

/// One parsed input line, as handed to the builder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    /// A regular operation.
    Op(Operation),
    /// Opens a loop body (`FOR_BEGIN`).
    LoopBegin {
        /// Original line text.
        text: String,
    },
    /// Closes the innermost open loop body (`FOR_END`).
    LoopEnd {
        /// Original line text.
        text: String,
    },
}

impl Statement {
    /// Returns the original text of the statement.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Op(op) => op.text(),
            Self::LoopBegin { text } | Self::LoopEnd { text } => text,
        }
    }
}

impl From<Operation> for Statement {
    fn from(op: Operation) -> Self {
        Self::Op(op)
    }
}

/// What a graph node stands for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A regular operation.
    Op,
    /// A `FOR_BEGIN` boundary marker.
    LoopBegin,
    /// A `FOR_END` boundary marker.
    LoopEnd,
}

impl NodeKind {
    /// Returns `true` for loop boundary markers.
    #[must_use]
    pub const fn is_marker(self) -> bool {
        matches!(self, Self::LoopBegin | Self::LoopEnd)
    }
}
