// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reusable scratch buffers for graph traversals.

use alloc::vec::Vec;

use hashbrown::HashSet;

use crate::operation::OpId;

/// Reusable scratch storage for reachability walks.
///
/// The builder runs one walk per admitted producer that settles pending
/// reads, so it keeps a single instance and reuses its capacity.
///
/// # See Also
///
/// - [`Graph::depends_on`](crate::Graph::depends_on): The walk using this storage.
#[derive(Debug, Default)]
pub struct TraversalScratch {
    pub(crate) stack: Vec<OpId>,
    pub(crate) visited: HashSet<OpId>,
}

impl TraversalScratch {
    /// Creates an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            visited: HashSet::new(),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.stack.clear();
        self.visited.clear();
    }

    /// Whether the last walk reached `id`.
    pub(crate) fn contains(&self, id: OpId) -> bool {
        self.visited.contains(&id)
    }
}
