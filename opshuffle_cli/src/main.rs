// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `opshuffle`: reorder an operation program at random without breaking it.
//!
//! Reads `outputs = Op(inputs)` lines from a file or standard input, builds
//! the dependency graph and prints one random valid order.

mod input;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use opshuffle::{
    DEFAULT_MAX_LOOP_DEPTH, Limits, Schedule, Scheduler, ShuffleWaves, Sink, StableWaves,
    build_graph,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::input::Source;
use crate::output::WriterSink;

#[derive(Parser, Debug)]
#[command(name = "opshuffle")]
#[command(about = "Randomly reorder single-assignment operations while keeping every dependency")]
struct Args {
    /// File to read operations from. Reads standard input when omitted; an
    /// interactive terminal stops at the first empty line.
    input: Option<PathBuf>,

    /// Write the reordered program here instead of standard output.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed for a reproducible order.
    #[arg(long)]
    seed: Option<u64>,

    /// Deepest loop nesting accepted.
    #[arg(long, default_value_t = DEFAULT_MAX_LOOP_DEPTH)]
    max_loop_depth: usize,

    /// Keep input order inside every wave instead of shuffling.
    #[arg(long)]
    stable: bool,

    /// More log output (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let source = match &args.input {
        Some(path) => Source::File(path.clone()),
        None => Source::Stdin,
    };
    let text = source.read()?;

    let parsed = opshuffle::parse::parse_program(&text);
    for skipped in &parsed.skipped {
        warn!(line = skipped.line_number, "skipping line: {}", skipped.error);
    }
    info!(
        statements = parsed.statements.len(),
        skipped = parsed.skipped.len(),
        "parsed input"
    );

    let limits = Limits::new().with_max_loop_depth(args.max_loop_depth);
    let graph = build_graph(parsed.statements, limits).context("failed to build dependency graph")?;
    let schedule = run_scheduler(&args, limits, graph).context("failed to schedule operations")?;

    let mut sink = WriterSink::open(args.output.as_deref())?;
    sink.accept(schedule.texts())
        .context("failed to write reordered program")?;
    Ok(())
}

fn run_scheduler(
    args: &Args,
    limits: Limits,
    graph: opshuffle::Graph,
) -> Result<Schedule, opshuffle::ScheduleError> {
    if args.stable {
        return Scheduler::new(StableWaves).with_limits(limits).run(graph);
    }
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Scheduler::new(ShuffleWaves::new(rng))
        .with_limits(limits)
        .run(graph)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "opshuffle=debug,opshuffle_cli=debug,info",
        _ => "opshuffle=trace,opshuffle_cli=trace,info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}
