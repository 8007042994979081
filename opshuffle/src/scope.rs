// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lexical scopes for variable resolution.
//!
//! A [`ScopeChain`] is a stack of frames. Each frame only stores the bindings
//! made while it was the innermost frame; lookups walk from the innermost
//! frame outward, so entering a loop body costs one empty frame instead of a
//! copy of everything visible.

use alloc::vec::Vec;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::operation::OpId;
use crate::symbol::Symbol;

/// Operations that read a variable before any visible producer existed.
pub(crate) type Readers = SmallVec<[OpId; 2]>;

#[derive(Debug, Clone, Default)]
struct Frame {
    /// Most recent producer of each name defined in this frame.
    bindings: HashMap<Symbol, OpId>,
    /// Reads in this frame that found no producer, keyed by variable.
    awaiting: HashMap<Symbol, Readers>,
}

/// Stack of variable-visibility frames.
///
/// Frame 0 is the top level and can never be exited.
///
/// # Example
///
/// ```rust
/// use opshuffle::scope::ScopeChain;
/// use opshuffle::symbol::SymbolTable;
/// use opshuffle::OpId;
///
/// let mut names = SymbolTable::new();
/// let x = names.intern("x");
/// let t = names.intern("t");
///
/// let mut scopes = ScopeChain::new();
/// scopes.define(x, OpId::new(0), 0);
///
/// scopes.enter();
/// // Outer bindings are visible inside the loop body.
/// assert_eq!(scopes.resolve_producer(x), Some(OpId::new(0)));
/// scopes.define(t, OpId::new(2), scopes.depth());
/// assert_eq!(scopes.resolve_producer(t), Some(OpId::new(2)));
///
/// // Leaving the body forgets what it defined.
/// assert_eq!(scopes.exit().unwrap(), vec![t]);
/// assert_eq!(scopes.resolve_producer(t), None);
/// assert_eq!(scopes.resolve_producer(x), Some(OpId::new(0)));
/// ```
#[derive(Debug, Clone)]
pub struct ScopeChain {
    frames: Vec<Frame>,
}

impl Default for ScopeChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeChain {
    /// Creates a chain holding only the top-level frame.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: alloc::vec![Frame::default()],
        }
    }

    /// Current nesting depth; the top level is depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Pushes a frame for a loop body.
    ///
    /// Everything visible in the enclosing frames stays visible, but the new
    /// frame does not own any of it.
    pub fn enter(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Pops the innermost frame and returns the names it defined.
    ///
    /// Those names are forgotten: later lookups fall through to whatever the
    /// enclosing frames bind. Returns `None` at the top level, which cannot
    /// be exited.
    pub fn exit(&mut self) -> Option<Vec<Symbol>> {
        if self.frames.len() == 1 {
            return None;
        }
        let frame = self.frames.pop()?;
        let mut removed: Vec<Symbol> = frame.bindings.into_keys().collect();
        removed.sort_unstable();
        Some(removed)
    }

    /// Finds the nearest visible producer of `name`, innermost frame first.
    #[must_use]
    pub fn resolve_producer(&self, name: Symbol) -> Option<OpId> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.bindings.get(&name).copied())
    }

    /// Like [`resolve_producer`](Self::resolve_producer), also returning the
    /// depth of the frame that owns the binding.
    #[must_use]
    pub fn resolve_with_depth(&self, name: Symbol) -> Option<(OpId, usize)> {
        self.frames
            .iter()
            .enumerate()
            .rev()
            .find_map(|(depth, frame)| frame.bindings.get(&name).map(|&op| (op, depth)))
    }

    /// Records `name` as produced by `op` in the frame at `depth`.
    ///
    /// A previous binding of `name` in that frame is overwritten (last writer
    /// wins). Depths deeper than the current one are clamped to the innermost
    /// frame.
    pub fn define(&mut self, name: Symbol, op: OpId, depth: usize) {
        debug_assert!(
            depth <= self.depth(),
            "define at depth {depth} beyond innermost frame {}",
            self.depth()
        );
        let depth = depth.min(self.depth());
        self.frames[depth].bindings.insert(name, op);
    }

    /// Notes that `reader` read `name` in the innermost frame while no
    /// producer was visible.
    pub(crate) fn note_unresolved(&mut self, name: Symbol, reader: OpId) {
        let readers = self
            .frames
            .last_mut()
            .map(|frame| frame.awaiting.entry(name).or_default());
        if let Some(readers) = readers
            && !readers.contains(&reader)
        {
            readers.push(reader);
        }
    }

    /// Removes and returns the unresolved readers of `name` in the innermost frame.
    pub(crate) fn take_awaiting(&mut self, name: Symbol) -> Readers {
        self.frames
            .last_mut()
            .and_then(|frame| frame.awaiting.remove(&name))
            .unwrap_or_default()
    }
}
