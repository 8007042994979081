// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-pass construction of the dependency graph.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::config::Limits;
use crate::error::{BuildError, LoopImbalance};
use crate::graph::{Block, Graph, LoopBlock};
use crate::operation::{NodeKind, OpId, Operation, Statement};
use crate::scope::ScopeChain;
use crate::scratch::TraversalScratch;
use crate::symbol::{Symbol, SymbolTable};

#[derive(Debug)]
struct OpenLoop {
    begin: OpId,
    body: Block,
}

/// Builds a [`Graph`] from operations in program order.
///
/// Each admitted operation gets the next [`OpId`]. Its inputs are resolved
/// against the visible scopes: a resolved input becomes an edge from the
/// producer, an unresolved one is a free input. Its outputs then become the
/// most recent binding of each name in the current scope.
///
/// Every loop is one unit of its enclosing block. When a body reads a
/// variable produced in an enclosing block, the edge is carried by the
/// outermost loop of that block which contains the reader, so the whole loop
/// is scheduled after the producer.
///
/// The first error poisons the builder: every later call returns the same
/// error, so a failed build can never yield a graph.
///
/// # Example
///
/// ```rust
/// use opshuffle::{BuildError, GraphBuilder, Operation};
///
/// let mut builder = GraphBuilder::new();
/// builder.admit(Operation::new(["b"], ["a"], "a = f(b)")).unwrap();
///
/// // `b` was read before it had a producer, and its producer now depends on
/// // that read.
/// let err = builder.admit(Operation::new(["a"], ["b"], "b = f(a)")).unwrap_err();
/// assert!(matches!(err, BuildError::CircularReference { .. }));
/// assert!(builder.finish().is_err());
/// ```
#[derive(Debug)]
pub struct GraphBuilder {
    graph: Graph,
    scopes: ScopeChain,
    symbols: SymbolTable,
    root: Block,
    open: Vec<OpenLoop>,
    limits: Limits,
    scratch: TraversalScratch,
    poisoned: Option<BuildError>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Creates a builder with default [`Limits`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    /// Creates a builder with the given limits.
    #[must_use]
    pub fn with_limits(limits: Limits) -> Self {
        Self {
            graph: Graph::new(),
            scopes: ScopeChain::new(),
            symbols: SymbolTable::new(),
            root: Block::new(),
            open: Vec::new(),
            limits,
            scratch: TraversalScratch::new(),
            poisoned: None,
        }
    }

    /// Current loop nesting depth (0 at the top level).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Number of nodes admitted so far, loop markers included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// Returns `true` if nothing was admitted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Read access to the graph under construction.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Admits one parsed statement.
    ///
    /// # Errors
    ///
    /// Whatever [`admit`](Self::admit), [`open_loop`](Self::open_loop) or
    /// [`close_loop`](Self::close_loop) report.
    pub fn push(&mut self, statement: Statement) -> Result<OpId, BuildError> {
        match statement {
            Statement::Op(op) => self.admit(op),
            Statement::LoopBegin { text } => self.open_loop(text),
            Statement::LoopEnd { text } => self.close_loop(text),
        }
    }

    /// Admits an operation into the innermost open block.
    ///
    /// # Errors
    ///
    /// [`BuildError::CircularReference`] when one of the outputs is a variable
    /// that an upstream operation of the same scope read while it had no
    /// producer (including this very operation).
    pub fn admit(&mut self, operation: Operation) -> Result<OpId, BuildError> {
        self.check_poisoned()?;

        let inputs: SmallVec<[Symbol; 4]> = operation
            .inputs()
            .iter()
            .map(|name| self.symbols.intern(name))
            .collect();
        let outputs: SmallVec<[Symbol; 4]> = operation
            .outputs()
            .iter()
            .map(|name| self.symbols.intern(name))
            .collect();

        let id = self.graph.push_node(NodeKind::Op, operation);
        self.current_block().push_op(id);

        for &input in &inputs {
            match self.scopes.resolve_with_depth(input) {
                Some((producer, depth)) => {
                    let unit = self.unit_at(depth, id);
                    if self.graph.add_edge(producer, id, unit) {
                        trace!(%producer, consumer = %id, %unit, variable = self.name(input), "edge");
                    }
                }
                None => self.scopes.note_unresolved(input, id),
            }
        }

        // Reads awaiting any of the outputs. A single walk over the new
        // operation's ancestors answers all of them; ids below the oldest
        // reader cannot lead back to it.
        let mut pending: SmallVec<[(Symbol, OpId); 4]> = SmallVec::new();
        for &output in &outputs {
            pending.extend(
                self.scopes
                    .take_awaiting(output)
                    .into_iter()
                    .map(|reader| (output, reader)),
            );
        }
        if let Some(floor) = pending.iter().map(|&(_, reader)| reader).min() {
            self.graph.mark_ancestors(id, floor, &mut self.scratch);
            let scratch = &self.scratch;
            if let Some(&(output, reader)) =
                pending.iter().find(|&&(_, reader)| scratch.contains(reader))
            {
                let err = BuildError::CircularReference {
                    variable: self.name(output).to_string(),
                    reader,
                    producer: id,
                };
                debug!(%err, "build aborted");
                return Err(self.poison(err));
            }
        }

        let depth = self.scopes.depth();
        for &output in &outputs {
            self.scopes.define(output, id, depth);
        }

        Ok(id)
    }

    /// Admits a `FOR_BEGIN` marker and opens a loop body with its own scope.
    ///
    /// # Errors
    ///
    /// [`BuildError::RecursionLimit`] when the new body would be nested deeper
    /// than [`Limits::max_loop_depth`].
    pub fn open_loop(&mut self, text: impl Into<String>) -> Result<OpId, BuildError> {
        self.check_poisoned()?;

        let depth = self.depth() + 1;
        let limit = self.limits.max_loop_depth();
        if depth > limit {
            return Err(self.poison(BuildError::RecursionLimit { depth, limit }));
        }

        let begin = self
            .graph
            .push_node(NodeKind::LoopBegin, Operation::marker(text));
        self.open.push(OpenLoop {
            begin,
            body: Block::new(),
        });
        self.scopes.enter();
        trace!(%begin, depth, "loop opened");
        Ok(begin)
    }

    /// Admits a `FOR_END` marker and closes the innermost loop body.
    ///
    /// Names defined only inside the body are forgotten. The finished loop
    /// becomes one unit of the enclosing block.
    ///
    /// # Errors
    ///
    /// [`BuildError::UnbalancedLoop`] when no loop is open.
    pub fn close_loop(&mut self, text: impl Into<String>) -> Result<OpId, BuildError> {
        self.check_poisoned()?;

        let Some(open) = self.open.pop() else {
            return Err(self.poison(BuildError::UnbalancedLoop(LoopImbalance::UnmatchedEnd)));
        };
        let end = self
            .graph
            .push_node(NodeKind::LoopEnd, Operation::marker(text));

        let forgotten = self.scopes.exit().unwrap_or_default();
        if !forgotten.is_empty() {
            let names: Vec<&str> = forgotten.iter().map(|&s| self.name(s)).collect();
            debug!(begin = %open.begin, %end, ?names, "loop closed, names forgotten");
        }

        self.current_block().push_loop(LoopBlock {
            begin: open.begin,
            body: open.body,
            end,
        });
        Ok(end)
    }

    /// Finishes the build.
    ///
    /// # Errors
    ///
    /// [`BuildError::UnbalancedLoop`] when loops are still open, or the error
    /// that poisoned the builder earlier.
    pub fn finish(mut self) -> Result<Graph, BuildError> {
        self.check_poisoned()?;
        if !self.open.is_empty() {
            return Err(BuildError::UnbalancedLoop(LoopImbalance::Unclosed {
                open: self.open.len(),
            }));
        }

        debug_assert_eq!(
            self.root.node_count(),
            self.graph.len(),
            "every node must be reachable from the root block"
        );
        debug!(
            nodes = self.graph.len(),
            variables = self.symbols.len(),
            "graph built"
        );
        self.graph.set_root(self.root);
        Ok(self.graph)
    }

    fn current_block(&mut self) -> &mut Block {
        match self.open.last_mut() {
            Some(open) => &mut open.body,
            None => &mut self.root,
        }
    }

    /// The unit of the block at `depth` that holds `consumer`: the consumer
    /// itself in its own block, otherwise the loop opened from that block.
    fn unit_at(&self, depth: usize, consumer: OpId) -> OpId {
        self.open.get(depth).map_or(consumer, |open| open.begin)
    }

    fn name(&self, symbol: Symbol) -> &str {
        self.symbols.resolve(symbol).unwrap_or("?")
    }

    fn check_poisoned(&self) -> Result<(), BuildError> {
        match &self.poisoned {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn poison(&mut self, err: BuildError) -> BuildError {
        self.poisoned = Some(err.clone());
        err
    }
}

/// Builds a graph from a sequence of statements.
///
/// ```rust
/// use opshuffle::{Limits, Operation, Statement, build_graph};
///
/// let graph = build_graph(
///     [
///         Statement::LoopBegin { text: "FOR_BEGIN".into() },
///         Operation::new(["x"], ["t"], "t = f(x)").into(),
///         Statement::LoopEnd { text: "FOR_END".into() },
///     ],
///     Limits::default(),
/// )
/// .unwrap();
/// assert_eq!(graph.len(), 3);
/// ```
///
/// # Errors
///
/// Any [`BuildError`]; no partial graph is returned.
pub fn build_graph<I>(statements: I, limits: Limits) -> Result<Graph, BuildError>
where
    I: IntoIterator<Item = Statement>,
{
    let mut builder = GraphBuilder::with_limits(limits);
    for statement in statements {
        builder.push(statement)?;
    }
    builder.finish()
}
