// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Randomized, scope-aware topological scheduling.

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use rand::RngCore;
use tracing::{debug, trace};

use crate::config::Limits;
use crate::error::ScheduleError;
use crate::graph::{Block, BlockItem, Graph, LoopBlock};
use crate::operation::OpId;
use crate::policy::{ShuffleWaves, WavePolicy};
use crate::trace::{NoTrace, ScheduleTrace};

/// A complete emission order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    ids: Vec<OpId>,
    texts: Vec<String>,
}

impl Schedule {
    /// Node ids in emission order.
    #[must_use]
    pub fn ids(&self) -> &[OpId] {
        &self.ids
    }

    /// Original line texts in emission order.
    #[must_use]
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    /// Consumes the schedule and returns the texts.
    #[must_use]
    pub fn into_texts(self) -> Vec<String> {
        self.texts
    }

    /// Number of emitted nodes, loop markers included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` for the schedule of an empty graph.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Level-synchronous Kahn scheduler.
///
/// Each block is drained in waves: the whole ready set is taken at once,
/// ordered by the [`WavePolicy`], and emitted. Units released while a wave is
/// emitted wait for the next wave. A loop is one unit of its enclosing block;
/// emitting it writes `FOR_BEGIN`, the body scheduled recursively, then
/// `FOR_END`. Loops therefore move among their neighbours as a whole.
///
/// # Example
///
/// ```
/// use opshuffle::{GraphBuilder, Operation, Scheduler, StableWaves, WaveRecorder};
///
/// let mut builder = GraphBuilder::new();
/// builder.admit(Operation::new(["c", "d", "e"], ["a"], "a = f(c, d, e)")).unwrap();
/// builder.admit(Operation::new(["a", "h"], ["b"], "b = f(a, h)")).unwrap();
/// builder.admit(Operation::new(["k"], ["g"], "g = f(k)")).unwrap();
/// let graph = builder.finish().unwrap();
///
/// let mut scheduler = Scheduler::new(StableWaves).with_trace(WaveRecorder::new());
/// let schedule = scheduler.run(graph).unwrap();
///
/// assert_eq!(schedule.texts(), ["a = f(c, d, e)", "g = f(k)", "b = f(a, h)"]);
/// assert_eq!(scheduler.trace().waves().len(), 2);
/// assert_eq!(scheduler.trace().waves()[1].round, 1);
/// ```
#[derive(Debug)]
pub struct Scheduler<P, T = NoTrace> {
    policy: P,
    limits: Limits,
    trace: T,
}

impl<P: WavePolicy> Scheduler<P> {
    /// Creates a scheduler ordering waves with `policy`.
    #[must_use]
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            limits: Limits::default(),
            trace: NoTrace,
        }
    }
}

impl<P: WavePolicy, T: ScheduleTrace> Scheduler<P, T> {
    /// Replaces the limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Installs a trace sink.
    #[must_use]
    pub fn with_trace<U: ScheduleTrace>(self, trace: U) -> Scheduler<P, U> {
        Scheduler {
            policy: self.policy,
            limits: self.limits,
            trace,
        }
    }

    /// The installed trace sink.
    #[must_use]
    pub fn trace(&self) -> &T {
        &self.trace
    }

    /// Schedules every node of `graph`.
    ///
    /// The graph is consumed: in-degrees are decremented in place and the
    /// operation texts are moved into the result.
    ///
    /// # Errors
    ///
    /// - [`ScheduleError::IncompleteSchedule`] if some block holds a cycle.
    /// - [`ScheduleError::RecursionLimit`] if loops nest deeper than
    ///   [`Limits::max_loop_depth`].
    pub fn run(&mut self, mut graph: Graph) -> Result<Schedule, ScheduleError> {
        let expected = graph.len();
        let root = graph.take_root();
        let mut ids = Vec::with_capacity(expected);

        self.schedule_block(&mut graph, &root, 0, &mut ids)?;
        if ids.len() != expected {
            return Err(ScheduleError::IncompleteSchedule {
                emitted: ids.len(),
                expected,
            });
        }

        let texts = ids.iter().map(|&id| graph.take_text(id)).collect();
        debug!(nodes = expected, "schedule complete");
        Ok(Schedule { ids, texts })
    }

    fn schedule_block(
        &mut self,
        graph: &mut Graph,
        block: &Block,
        depth: usize,
        out: &mut Vec<OpId>,
    ) -> Result<(), ScheduleError> {
        let limit = self.limits.max_loop_depth();
        if depth > limit {
            return Err(ScheduleError::RecursionLimit { depth, limit });
        }

        let loops: HashMap<OpId, &LoopBlock> = block
            .items()
            .iter()
            .filter_map(|item| match item {
                BlockItem::Loop(lp) => Some((lp.begin(), lp)),
                BlockItem::Op(_) => None,
            })
            .collect();
        let mut wave: Vec<OpId> = block
            .items()
            .iter()
            .map(BlockItem::unit)
            .filter(|&id| graph.in_degree(id) == 0)
            .collect();
        let mut next = Vec::new();
        let mut emitted = 0;
        let mut round = 0;

        while !wave.is_empty() {
            self.policy.order_wave(&mut wave);
            self.trace.wave(depth, round, &wave);
            trace!(depth, round, size = wave.len(), "wave");

            for &unit in &wave {
                match loops.get(&unit) {
                    Some(lp) => {
                        out.push(lp.begin());
                        self.trace.loop_entered(depth + 1, lp.begin());
                        self.schedule_block(graph, lp.body(), depth + 1, out)?;
                        out.push(lp.end());
                    }
                    None => out.push(unit),
                }
                graph.release(unit, |ready| next.push(ready));
            }
            emitted += wave.len();
            round += 1;

            wave.clear();
            core::mem::swap(&mut wave, &mut next);
        }

        let expected = block.items().len();
        if emitted != expected {
            debug!(depth, emitted, expected, "block stalled");
            return Err(ScheduleError::IncompleteSchedule { emitted, expected });
        }
        Ok(())
    }
}

/// Schedules `graph` with a uniform shuffle of every wave drawn from `rng`.
///
/// Returns the original line texts in emission order, loop markers included.
///
/// ```
/// use opshuffle::{Limits, Operation, Statement, build_graph, schedule};
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let program = [
///     Statement::from(Operation::new(["x"], ["a"], "a = f(x)")),
///     Statement::LoopBegin { text: "FOR_BEGIN".into() },
///     Statement::from(Operation::new(["a"], ["t"], "t = g(a)")),
///     Statement::LoopEnd { text: "FOR_END".into() },
/// ];
/// let graph = build_graph(program, Limits::default()).unwrap();
/// let lines = schedule(graph, &mut StdRng::seed_from_u64(42)).unwrap();
/// assert_eq!(lines, ["a = f(x)", "FOR_BEGIN", "t = g(a)", "FOR_END"]);
/// ```
///
/// # Errors
///
/// See [`Scheduler::run`].
pub fn schedule<R: RngCore + ?Sized>(
    graph: Graph,
    rng: &mut R,
) -> Result<Vec<String>, ScheduleError> {
    Scheduler::new(ShuffleWaves::new(rng))
        .run(graph)
        .map(Schedule::into_texts)
}
