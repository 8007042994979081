// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opshuffle: dependency-aware randomized reordering of operation sequences.
//!
//! A program is a list of single-assignment lines `outputs = Op(inputs)`,
//! optionally grouped into loop bodies by `FOR_BEGIN` / `FOR_END` lines. This
//! crate produces a random permutation of such a program that still respects
//! every data dependency, which makes it useful to diversify or obfuscate the
//! layout of generated code without changing what it computes.
//!
//! The pipeline has three stages:
//!
//! - **Parsing** ([`parse`]): lines become [`Statement`]s. Malformed lines are
//!   reported as values and skipped.
//! - **Graph building** ([`GraphBuilder`], [`build_graph`]): each operation is
//!   admitted in order, its inputs are resolved against lexical scopes
//!   ([`scope::ScopeChain`]) and turned into edges from the last producer.
//!   Loop bodies get their own scope; names defined inside are forgotten on
//!   exit.
//! - **Scheduling** ([`Scheduler`], [`schedule()`]): a wave-by-wave Kahn
//!   traversal permutes each wave with a [`WavePolicy`]. Every loop is a
//!   single unit of its enclosing block: it moves with its markers and body
//!   together, after every outer producer its body reads. Bodies are
//!   scheduled on their own.
//!
//! ## Quick Start
//!
//! ```rust
//! use opshuffle::{Limits, build_graph, parse::parse_program, schedule};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let parsed = parse_program(
//!     "a = f(c, d, e)\n\
//!      b = f(a, h)\n\
//!      FOR_BEGIN\n\
//!      t = g(b)\n\
//!      FOR_END\n",
//! );
//! assert!(parsed.skipped.is_empty());
//!
//! let graph = build_graph(parsed.statements, Limits::default()).unwrap();
//! let lines = schedule(graph, &mut StdRng::seed_from_u64(1)).unwrap();
//! assert_eq!(lines, ["a = f(c, d, e)", "b = f(a, h)", "FOR_BEGIN", "t = g(b)", "FOR_END"]);
//! ```
//!
//! ## Errors
//!
//! Building fails with [`BuildError`] on circular references, unbalanced
//! loops, or loops nested deeper than [`Limits::max_loop_depth`]. Scheduling
//! fails with [`ScheduleError`] and never returns a truncated order.
//!
//! ## Logging
//!
//! Builder and scheduler events are emitted through [`tracing`] at the
//! `debug` and `trace` levels. Nothing is printed unless the embedding
//! application installs a subscriber.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod builder;
mod config;
mod error;
mod graph;
mod operation;
pub mod parse;
mod policy;
mod schedule;
pub mod scope;
mod scratch;
mod sink;
pub mod symbol;
pub mod trace;

pub use builder::{GraphBuilder, build_graph};
pub use config::{DEFAULT_MAX_LOOP_DEPTH, Limits};
pub use error::{BuildError, LoopImbalance, ScheduleError};
pub use graph::{Block, BlockItem, Graph, LoopBlock};
pub use operation::{Names, NodeKind, OpId, Operation, Statement};
pub use policy::{ShuffleWaves, StableWaves, WavePolicy};
pub use schedule::{Schedule, Scheduler, schedule};
pub use scratch::TraversalScratch;
pub use sink::Sink;
pub use trace::{NoTrace, ScheduleTrace, WaveRecorder};
