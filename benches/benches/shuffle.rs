// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use opshuffle::parse::parse_program;
use opshuffle::{
    GraphBuilder, Limits, Operation, Scheduler, ShuffleWaves, StableWaves, Statement, build_graph,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `n` operations, each reading up to `fan_in` earlier results, with a loop
/// opened every `loop_every` operations (0 for none).
fn build_program(n: usize, fan_in: usize, loop_every: usize, seed: u64) -> Vec<Statement> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(n + n / loop_every.max(1) * 2);
    let mut open = false;

    for i in 0..n {
        if loop_every != 0 && i % loop_every == 0 && i != 0 {
            let text = if open { "FOR_END" } else { "FOR_BEGIN" };
            out.push(if open {
                Statement::LoopEnd { text: text.into() }
            } else {
                Statement::LoopBegin { text: text.into() }
            });
            open = !open;
        }
        let inputs: Vec<String> = (0..fan_in.min(i))
            .map(|_| format!("v{}", rng.gen_range(0..i)))
            .collect();
        let output = format!("v{i}");
        let text = format!("{output} = op({})", inputs.join(", "));
        out.push(Operation::new(inputs, [output], text).into());
    }
    if open {
        out.push(Statement::LoopEnd {
            text: "FOR_END".into(),
        });
    }
    out
}

fn render(program: &[Statement]) -> String {
    program
        .iter()
        .map(Statement::text)
        .collect::<Vec<_>>()
        .join("\n")
}

fn bench_shuffle(c: &mut Criterion) {
    let mut group = c.benchmark_group("opshuffle");
    group.sample_size(50);

    for &(n, fan_in, loop_every) in &[
        (256_usize, 1_usize, 0_usize),
        (256, 4, 0),
        (4_096, 1, 0),
        (4_096, 4, 0),
        (4_096, 4, 64),
    ] {
        let label = format!("n={n},k={fan_in},loop={loop_every}");

        group.bench_function(format!("parse({label})"), |b| {
            let text = render(&build_program(n, fan_in, loop_every, 0x0B5F_0000_0000_0001));
            b.iter(|| black_box(parse_program(&text)));
        });

        group.bench_function(format!("build({label})"), |b| {
            b.iter_batched(
                || build_program(n, fan_in, loop_every, 0x0B5F_0000_0000_0002),
                |program| {
                    let mut builder = GraphBuilder::new();
                    for statement in program {
                        let _ = builder.push(statement).expect("generated program is acyclic");
                    }
                    black_box(builder.finish().expect("balanced"));
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("schedule_shuffled({label})"), |b| {
            let program = build_program(n, fan_in, loop_every, 0x0B5F_0000_0000_0003);
            let graph = build_graph(program, Limits::default()).expect("valid program");
            let mut policy = ShuffleWaves::new(StdRng::seed_from_u64(1));
            b.iter_batched(
                || graph.clone(),
                |graph| black_box(Scheduler::new(&mut policy).run(graph).expect("acyclic")),
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("schedule_stable({label})"), |b| {
            let program = build_program(n, fan_in, loop_every, 0x0B5F_0000_0000_0004);
            let graph = build_graph(program, Limits::default()).expect("valid program");
            b.iter_batched(
                || graph.clone(),
                |graph| black_box(Scheduler::new(StableWaves).run(graph).expect("acyclic")),
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_shuffle);
criterion_main!(benches);
