// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interning of variable names.
//!
//! Scope frames and pending-read tables are keyed by [`Symbol`] so lookups on
//! the hot path hash a `u32` instead of a string. The table stores each name
//! once.
//!
//! ```rust
//! use opshuffle::symbol::SymbolTable;
//!
//! let mut names = SymbolTable::new();
//! let a = names.intern("a");
//! assert_eq!(names.intern("a"), a);
//! assert_ne!(names.intern("b"), a);
//! assert_eq!(names.resolve(a), Some("a"));
//! assert_eq!(names.get("c"), None);
//! ```

use alloc::string::String;
use alloc::vec::Vec;
use core::hash::BuildHasher;

use hashbrown::DefaultHashBuilder;
use hashbrown::HashMap;
use smallvec::SmallVec;

/// A compact handle for an interned variable name.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Symbol(u32);

impl Symbol {
    /// Returns this symbol as a `usize` index.
    #[inline]
    #[must_use]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Interns variable names into [`Symbol`] handles.
///
/// Lookups go through a hash-bucket index (hash -> small list of candidate
/// symbols), so the name text is only stored in one place.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    names: Vec<String>,
    buckets: HashMap<u64, SmallVec<[Symbol; 1]>>,
    build_hasher: DefaultHashBuilder,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            buckets: HashMap::new(),
            build_hasher: DefaultHashBuilder::default(),
        }
    }

    /// Returns the number of interned names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if no name has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the name behind `symbol`, if it came from this table.
    #[must_use]
    pub fn resolve(&self, symbol: Symbol) -> Option<&str> {
        self.names.get(symbol.as_usize()).map(String::as_str)
    }

    /// Looks up `name` without interning it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Symbol> {
        let hash = self.build_hasher.hash_one(name);
        self.buckets
            .get(&hash)?
            .iter()
            .copied()
            .find(|s| self.names[s.as_usize()] == name)
    }

    /// Interns `name` and returns its [`Symbol`].
    ///
    /// The name is only copied the first time it is seen.
    pub fn intern(&mut self, name: &str) -> Symbol {
        let hash = self.build_hasher.hash_one(name);
        if let Some(symbols) = self.buckets.get(&hash) {
            for &s in symbols {
                if self.names[s.as_usize()] == name {
                    return s;
                }
            }
        }

        let symbol = Symbol(
            u32::try_from(self.names.len()).expect("too many variable names for Symbol (u32)"),
        );
        self.names.push(String::from(name));
        self.buckets.entry(hash).or_default().push(symbol);
        symbol
    }
}
