// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Limits shared by the builder and the scheduler.

/// Default maximum loop nesting depth.
pub const DEFAULT_MAX_LOOP_DEPTH: usize = 1000;

/// Structural limits applied while building and scheduling.
///
/// ```rust
/// use opshuffle::Limits;
///
/// let limits = Limits::new().with_max_loop_depth(8);
/// assert_eq!(limits.max_loop_depth(), 8);
/// assert_eq!(Limits::default().max_loop_depth(), opshuffle::DEFAULT_MAX_LOOP_DEPTH);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Limits {
    max_loop_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self::new()
    }
}

impl Limits {
    /// Creates limits with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_loop_depth: DEFAULT_MAX_LOOP_DEPTH,
        }
    }

    /// Sets how many loops may be nested inside each other.
    ///
    /// The top level is depth 0, so a limit of 0 rejects every loop.
    #[must_use]
    pub const fn with_max_loop_depth(mut self, depth: usize) -> Self {
        self.max_loop_depth = depth;
        self
    }

    /// Maximum loop nesting depth.
    #[must_use]
    pub const fn max_loop_depth(&self) -> usize {
        self.max_loop_depth
    }
}
