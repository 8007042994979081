// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dependency graph storage.

use alloc::string::String;
use alloc::vec::Vec;

use smallvec::SmallVec;

use crate::operation::{NodeKind, OpId, Operation};
use crate::scratch::TraversalScratch;

type Adjacency = SmallVec<[OpId; 4]>;

/// A loop: its boundary markers and its body.
///
/// In the enclosing block the whole loop is scheduled as one unit, identified
/// by its `FOR_BEGIN` marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopBlock {
    pub(crate) begin: OpId,
    pub(crate) body: Block,
    pub(crate) end: OpId,
}

impl LoopBlock {
    /// The `FOR_BEGIN` marker, which also stands for the loop as a unit.
    #[must_use]
    pub fn begin(&self) -> OpId {
        self.begin
    }

    /// The loop body, scheduled on its own.
    #[must_use]
    pub fn body(&self) -> &Block {
        &self.body
    }

    /// The `FOR_END` marker.
    #[must_use]
    pub fn end(&self) -> OpId {
        self.end
    }
}

/// One schedulable unit of a [`Block`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockItem {
    /// A single operation.
    Op(OpId),
    /// A nested loop, moved as a whole.
    Loop(LoopBlock),
}

impl BlockItem {
    /// Id carrying this unit's edges: the operation itself, or the loop's
    /// `FOR_BEGIN` marker.
    #[must_use]
    pub fn unit(&self) -> OpId {
        match self {
            Self::Op(id) => *id,
            Self::Loop(lp) => lp.begin,
        }
    }
}

/// The lexical layout of one scope: operations and loops in source order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    items: Vec<BlockItem>,
}

impl Block {
    /// Creates an empty block.
    #[must_use]
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Items of the block in source order.
    #[must_use]
    pub fn items(&self) -> &[BlockItem] {
        &self.items
    }

    /// Number of nodes in this block, loop markers and nested bodies included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.items
            .iter()
            .map(|item| match item {
                BlockItem::Op(_) => 1,
                BlockItem::Loop(l) => 2 + l.body.node_count(),
            })
            .sum()
    }

    pub(crate) fn push_op(&mut self, op: OpId) {
        self.items.push(BlockItem::Op(op));
    }

    pub(crate) fn push_loop(&mut self, lp: LoopBlock) {
        self.items.push(BlockItem::Loop(lp));
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    operation: Operation,
}

/// Dependency graph over admitted operations.
///
/// Nodes live in an arena indexed by [`OpId`]. An edge `producer -> consumer`
/// means the consumer reads a variable the producer wrote last.
///
/// Scheduling happens per [`Block`], so every edge is also carried by a
/// *unit* of the producer's block: the consumer itself when both sit in the
/// same block, otherwise the outermost loop of that block enclosing the
/// consumer. Unit edges are what [`dependents`](Self::dependents) and
/// [`in_degree`](Self::in_degree) report. A loop reading several outer
/// variables of one producer still gets a single unit edge.
///
/// Graphs are produced by [`GraphBuilder`](crate::GraphBuilder) and consumed
/// by the [`Scheduler`](crate::Scheduler).
///
/// # Example
///
/// ```rust
/// use opshuffle::{GraphBuilder, NodeKind, Operation};
///
/// let mut builder = GraphBuilder::new();
/// let a = builder.admit(Operation::new(["c", "d", "e"], ["a"], "a = f(c, d, e)")).unwrap();
/// let b = builder.admit(Operation::new(["a", "h"], ["b"], "b = f(a, h)")).unwrap();
/// let begin = builder.open_loop("FOR_BEGIN").unwrap();
/// let t = builder.admit(Operation::new(["a"], ["t"], "t = g(a)")).unwrap();
/// builder.close_loop("FOR_END").unwrap();
/// let graph = builder.finish().unwrap();
///
/// assert_eq!(graph.len(), 5);
/// assert_eq!(graph.operation(b).unwrap().inputs(), ["a", "h"]);
/// assert_eq!(graph.kind(begin), Some(NodeKind::LoopBegin));
///
/// // `t` reads `a`; inside the top level that edge is carried by the loop.
/// assert!(graph.dependencies(t).any(|p| p == a));
/// assert_eq!(graph.dependents(a).collect::<Vec<_>>(), [b, begin]);
/// assert_eq!(graph.in_degree(begin), 1);
/// assert_eq!(graph.in_degree(t), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    /// Every resolved producer of a node.
    producers: Vec<Adjacency>,
    /// Units of the producer's block that wait on it.
    successors: Vec<Adjacency>,
    /// Unit in-degree.
    in_degree: Vec<u32>,
    root: Block,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            producers: Vec::new(),
            successors: Vec::new(),
            in_degree: Vec::new(),
            root: Block::new(),
        }
    }

    /// Number of nodes, loop markers included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if nothing was admitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all node ids in admission order.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "push_node refuses to grow past u32::MAX nodes"
    )]
    pub fn ids(&self) -> impl Iterator<Item = OpId> + '_ {
        (0..self.nodes.len()).map(|i| OpId::new(i as u32))
    }

    /// The top-level block.
    #[must_use]
    pub fn root(&self) -> &Block {
        &self.root
    }

    /// The operation behind `id`.
    #[must_use]
    pub fn operation(&self, id: OpId) -> Option<&Operation> {
        self.nodes.get(id.index()).map(|n| &n.operation)
    }

    /// What `id` stands for.
    #[must_use]
    pub fn kind(&self, id: OpId) -> Option<NodeKind> {
        self.nodes.get(id.index()).map(|n| n.kind)
    }

    /// Producers `id` reads from.
    ///
    /// Each producer appears once, in the order its edge was added.
    pub fn dependencies(&self, id: OpId) -> impl Iterator<Item = OpId> + '_ {
        self.producers
            .get(id.index())
            .map(SmallVec::as_slice)
            .unwrap_or(&[])
            .iter()
            .copied()
    }

    /// Units of the same block waiting on `id`: operations reading its
    /// outputs, or loops whose body does.
    pub fn dependents(&self, id: OpId) -> impl Iterator<Item = OpId> + '_ {
        self.successors
            .get(id.index())
            .map(SmallVec::as_slice)
            .unwrap_or(&[])
            .iter()
            .copied()
    }

    /// Number of producers the unit `id` still waits on.
    #[must_use]
    pub fn in_degree(&self, id: OpId) -> usize {
        self.in_degree.get(id.index()).map_or(0, |&d| d as usize)
    }

    /// Returns `true` if `unit` waits on `producer` directly.
    #[must_use]
    pub fn is_unit_edge(&self, producer: OpId, unit: OpId) -> bool {
        self.dependents(producer).any(|s| s == unit)
    }

    /// Returns `true` if `from` transitively depends on `to` (or is `to`).
    ///
    /// Walks producer edges depth first starting at `from`. Producers always
    /// have smaller ids than their consumers, so branches below `to` are cut.
    pub fn depends_on(&self, from: OpId, to: OpId, scratch: &mut TraversalScratch) -> bool {
        self.mark_ancestors(from, to, scratch);
        scratch.contains(to)
    }

    /// Collects `from` and every transitive producer with an id of at least
    /// `floor` into `scratch`.
    ///
    /// Any path ending at `from` only climbs through increasing ids, so nodes
    /// below `floor` cannot lead back to anything at or above it.
    pub(crate) fn mark_ancestors(&self, from: OpId, floor: OpId, scratch: &mut TraversalScratch) {
        scratch.reset();
        scratch.stack.push(from);

        while let Some(current) = scratch.stack.pop() {
            if current < floor || !scratch.visited.insert(current) {
                continue;
            }
            scratch.stack.extend(self.dependencies(current));
        }
    }

    /// Appends a node and returns its id. Storage grows by one slot.
    pub(crate) fn push_node(&mut self, kind: NodeKind, operation: Operation) -> OpId {
        let id = OpId::new(
            u32::try_from(self.nodes.len()).expect("too many operations for OpId (u32)"),
        );
        self.nodes.push(Node { kind, operation });
        self.producers.push(Adjacency::new());
        self.successors.push(Adjacency::new());
        self.in_degree.push(0);
        id
    }

    /// Records that `consumer` reads what `producer` wrote, and that `unit`
    /// (the consumer or a loop enclosing it) must wait for `producer`.
    ///
    /// Returns `false` when the pair was already recorded; a consumer reading
    /// several variables of one producer still gets a single edge.
    pub(crate) fn add_edge(&mut self, producer: OpId, consumer: OpId, unit: OpId) -> bool {
        let c = consumer.index();
        if self.producers[c].contains(&producer) {
            return false;
        }
        self.producers[c].push(producer);

        let p = producer.index();
        if !self.successors[p].contains(&unit) {
            self.successors[p].push(unit);
            self.in_degree[unit.index()] += 1;
        }
        true
    }

    pub(crate) fn set_root(&mut self, root: Block) {
        self.root = root;
    }

    pub(crate) fn take_root(&mut self) -> Block {
        core::mem::take(&mut self.root)
    }

    /// Marks `id` emitted: drops its unit out-edges and reports each unit
    /// whose in-degree reaches zero.
    pub(crate) fn release(&mut self, id: OpId, mut on_ready: impl FnMut(OpId)) {
        let successors = core::mem::take(&mut self.successors[id.index()]);
        for succ in successors {
            let deg = &mut self.in_degree[succ.index()];
            debug_assert!(*deg > 0, "in-degree underflow on {succ}");
            *deg = deg.saturating_sub(1);
            if *deg == 0 {
                on_ready(succ);
            }
        }
    }

    pub(crate) fn take_text(&mut self, id: OpId) -> String {
        core::mem::take(&mut self.nodes[id.index()].operation).into_text()
    }

    /// Adds a unit edge without any check; used to corrupt graphs in tests.
    #[cfg(test)]
    pub(crate) fn force_edge(&mut self, producer: OpId, unit: OpId) {
        self.producers[unit.index()].push(producer);
        self.successors[producer.index()].push(unit);
        self.in_degree[unit.index()] += 1;
    }
}
