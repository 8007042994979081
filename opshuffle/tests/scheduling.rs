// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end tests for the `opshuffle` crate.
//!
//! Programs go through the whole pipeline (parse, build, schedule) and the
//! resulting orders are checked against the dependency graph they came from.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use opshuffle::parse::parse_program;
use opshuffle::{
    BuildError, Graph, Limits, LoopImbalance, NodeKind, OpId, ScheduleError, Scheduler,
    ShuffleWaves, Sink, StableWaves, WaveRecorder, build_graph, schedule,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn graph_of(source: &str) -> Graph {
    let parsed = parse_program(source);
    assert!(parsed.skipped.is_empty(), "unexpected skipped lines: {:?}", parsed.skipped);
    build_graph(parsed.statements, Limits::default()).expect("program should build")
}

fn run_seeded(source: &str, seed: u64) -> Vec<String> {
    schedule(graph_of(source), &mut StdRng::seed_from_u64(seed)).expect("program should schedule")
}

/// Generates an acyclic program: inputs only name variables already produced
/// in a visible scope, or external `in*` variables that are never produced.
fn random_program(rng: &mut StdRng, ops: usize) -> String {
    let mut lines = Vec::new();
    let mut visible: Vec<Vec<String>> = vec![Vec::new()];
    let mut next_var = 0;

    for _ in 0..ops {
        let roll = rng.gen_range(0..10);
        if roll == 0 && visible.len() < 4 {
            lines.push("FOR_BEGIN".to_string());
            visible.push(Vec::new());
            continue;
        }
        if roll == 1 && visible.len() > 1 {
            lines.push("FOR_END".to_string());
            visible.pop();
            continue;
        }

        let known: Vec<&String> = visible.iter().flatten().collect();
        let mut inputs = Vec::new();
        for _ in 0..rng.gen_range(0..4) {
            if !known.is_empty() && rng.gen_bool(0.7) {
                inputs.push(known[rng.gen_range(0..known.len())].clone());
            } else {
                inputs.push(format!("in{}", rng.gen_range(0..5)));
            }
        }
        let output = if !known.is_empty() && rng.gen_bool(0.2) {
            known[rng.gen_range(0..known.len())].clone()
        } else {
            next_var += 1;
            format!("v{next_var}")
        };
        lines.push(format!("{output} = op({})", inputs.join(", ")));
        visible.last_mut().expect("root frame").push(output);
    }
    for _ in 1..visible.len() {
        lines.push("FOR_END".to_string());
    }
    lines.join("\n")
}

/// Innermost open `FOR_BEGIN` for every node when walking `order`. A
/// `FOR_END` maps to the loop it closes.
fn nesting(graph: &Graph, order: impl IntoIterator<Item = OpId>) -> BTreeMap<OpId, Option<OpId>> {
    let mut open: Vec<OpId> = Vec::new();
    let mut parent = BTreeMap::new();
    for id in order {
        match graph.kind(id) {
            Some(NodeKind::LoopEnd) => {
                parent.insert(id, open.pop());
            }
            Some(NodeKind::LoopBegin) => {
                parent.insert(id, open.last().copied());
                open.push(id);
            }
            _ => {
                parent.insert(id, open.last().copied());
            }
        }
    }
    assert!(open.is_empty(), "unclosed loops in order");
    parent
}

/// Unit edges of the whole graph, keyed by the waiting unit.
fn unit_producers(graph: &Graph) -> HashMap<OpId, Vec<OpId>> {
    let mut map: HashMap<OpId, Vec<OpId>> = HashMap::new();
    for producer in graph.ids() {
        for unit in graph.dependents(producer) {
            map.entry(unit).or_default().push(producer);
        }
    }
    map
}

#[test]
fn random_programs_schedule_to_valid_orders() {
    let mut gen_rng = StdRng::seed_from_u64(0x5EED);
    for round in 0..64 {
        let source = random_program(&mut gen_rng, 40);
        let graph = graph_of(&source);

        let mut policy = ShuffleWaves::new(StdRng::seed_from_u64(round));
        let result = Scheduler::new(&mut policy)
            .run(graph.clone())
            .expect("acyclic program should schedule");

        assert_eq!(result.len(), graph.len(), "round {round}: schedule truncated");
        let unique: BTreeSet<OpId> = result.ids().iter().copied().collect();
        assert_eq!(unique.len(), graph.len(), "round {round}: duplicate emission");

        let position: HashMap<OpId, usize> =
            result.ids().iter().enumerate().map(|(i, &id)| (id, i)).collect();
        for id in graph.ids() {
            for producer in graph.dependencies(id) {
                assert!(
                    position[&producer] < position[&id],
                    "round {round}: {producer} must precede {id}\n{source}"
                );
            }
        }

        assert_eq!(
            nesting(&graph, result.ids().iter().copied()),
            nesting(&graph, graph.ids()),
            "round {round}: nesting changed\n{source}"
        );
    }
}

#[test]
fn same_seed_gives_same_order() {
    let mut gen_rng = StdRng::seed_from_u64(11);
    let source = random_program(&mut gen_rng, 60);
    assert_eq!(run_seeded(&source, 99), run_seeded(&source, 99));
}

#[test]
fn independent_operations_appear_in_both_orders() {
    let source = "x = f(p)\ny = f(q)\n";
    let mut seen = BTreeSet::new();
    for seed in 0..200 {
        seen.insert(run_seeded(source, seed));
        if seen.len() == 2 {
            break;
        }
    }
    assert_eq!(seen.len(), 2, "both permutations should be reachable");
}

#[test]
fn chained_operations_have_a_single_order() {
    let source = "a = f(c, d, e)\nb = f(a, h)\n";
    let graph = graph_of(source);
    let a = OpId::new(0);
    let b = OpId::new(1);
    assert_eq!(graph.dependencies(b).collect::<Vec<_>>(), [a]);
    assert!(graph.is_unit_edge(a, b));

    for seed in 0..20 {
        assert_eq!(run_seeded(source, seed), ["a = f(c, d, e)", "b = f(a, h)"]);
    }
}

#[test]
fn loop_bodies_hide_their_definitions() {
    let graph = graph_of("FOR_BEGIN\nt = f(x)\nFOR_END\ny = f(t)\n");
    let y = OpId::new(3);
    assert_eq!(graph.kind(y), Some(NodeKind::Op));
    assert_eq!(graph.dependencies(y).count(), 0);
}

#[test]
fn loop_body_stays_between_its_markers() {
    let source = "FOR_BEGIN\na = f(x)\nb = f(a)\nFOR_END\n";
    for seed in 0..20 {
        assert_eq!(
            run_seeded(source, seed),
            ["FOR_BEGIN", "a = f(x)", "b = f(a)", "FOR_END"]
        );
    }
}

#[test]
fn loops_swap_with_independent_neighbours() {
    let source = "a = f(x)\nFOR_BEGIN\nt = g(y)\nFOR_END\nb = f(z)\n";
    let mut seen = BTreeSet::new();
    for seed in 0..200 {
        seen.insert(run_seeded(source, seed));
    }
    assert_eq!(seen.len(), 6, "all unit orders should be reachable: {seen:?}");
    for lines in &seen {
        let begin = lines.iter().position(|l| l == "FOR_BEGIN").expect("marker kept");
        assert_eq!(lines[begin + 1..begin + 3], ["t = g(y)", "FOR_END"]);
    }
    assert!(seen.iter().any(|lines| lines[0] == "FOR_BEGIN"));
    assert!(seen.iter().any(|lines| lines[0] == "b = f(z)"));
}

#[test]
fn loop_follows_outer_producers_its_body_reads() {
    let source = "a = f(x)\nc = f(a)\nFOR_BEGIN\nt = g(y)\nFOR_BEGIN\nu = g(a)\nFOR_END\nFOR_END\n";
    let mut loop_first = false;
    for seed in 0..100 {
        let lines = run_seeded(source, seed);
        let a = lines.iter().position(|l| l == "a = f(x)").expect("a emitted");
        let c = lines.iter().position(|l| l == "c = f(a)").expect("c emitted");
        let begin = lines.iter().position(|l| l == "FOR_BEGIN").expect("loop emitted");
        assert!(a < begin, "seed {seed}: loop must follow `a`: {lines:?}");
        loop_first |= begin < c;
    }
    assert!(loop_first, "the loop should be able to overtake `c`");
}

#[test]
fn nested_loops_keep_their_nesting() {
    let source = "\
        p = f(x)\n\
        q = f(y)\n\
        FOR_BEGIN\n\
        r = f(p)\n\
        FOR_BEGIN\n\
        s = f(r)\n\
        u = f(q)\n\
        FOR_END\n\
        FOR_END\n\
        w = f(p, q)\n";
    let mut placements = BTreeSet::new();
    for seed in 0..100 {
        let lines = run_seeded(source, seed);
        assert_eq!(lines.len(), 10);
        let head: BTreeSet<&str> = lines[..2].iter().map(String::as_str).collect();
        assert_eq!(head, BTreeSet::from(["p = f(x)", "q = f(y)"]));

        let (start, w) = if lines[2] == "FOR_BEGIN" { (2, 9) } else { (3, 2) };
        placements.insert(w);
        assert_eq!(lines[w], "w = f(p, q)");
        assert_eq!(lines[start], "FOR_BEGIN");
        assert_eq!(lines[start + 1], "r = f(p)");
        assert_eq!(lines[start + 2], "FOR_BEGIN");
        let inner: BTreeSet<&str> = lines[start + 3..start + 5].iter().map(String::as_str).collect();
        assert_eq!(inner, BTreeSet::from(["s = f(r)", "u = f(q)"]));
        assert_eq!(lines[start + 5], "FOR_END");
        assert_eq!(lines[start + 6], "FOR_END");
    }
    assert_eq!(placements.len(), 2, "`w` should land on both sides of the loop");
}

#[test]
fn waves_follow_release_order() {
    let mut gen_rng = StdRng::seed_from_u64(3);
    let source = random_program(&mut gen_rng, 50);
    let graph = graph_of(&source);

    let mut waves = WaveRecorder::new();
    Scheduler::new(ShuffleWaves::new(StdRng::seed_from_u64(4)))
        .with_trace(&mut waves)
        .run(graph.clone())
        .expect("acyclic program should schedule");

    let producers = unit_producers(&graph);
    let units = graph
        .ids()
        .filter(|&id| matches!(graph.kind(id), Some(NodeKind::Op | NodeKind::LoopBegin)));
    for unit in units {
        let round = waves.round_of(unit).expect("every unit is in a wave");
        let last = producers
            .get(&unit)
            .into_iter()
            .flatten()
            .filter_map(|&p| waves.round_of(p))
            .max();
        assert_eq!(
            round,
            last.map_or(0, |r| r + 1),
            "{unit} should follow its last producer\n{source}"
        );
    }
}

#[test]
fn circular_reference_is_reported() {
    let parsed = parse_program("a = f(b)\nb = f(a)\n");
    let err = build_graph(parsed.statements, Limits::default()).unwrap_err();
    assert!(matches!(
        err,
        BuildError::CircularReference { ref variable, .. } if variable == "b"
    ));
}

#[test]
fn circular_reference_inside_a_loop_is_reported() {
    let parsed = parse_program("x = f(y)\nFOR_BEGIN\na = f(b)\nb = f(a)\nFOR_END\n");
    let err = build_graph(parsed.statements, Limits::default()).unwrap_err();
    assert_eq!(
        err,
        BuildError::CircularReference {
            variable: "b".into(),
            reader: OpId::new(2),
            producer: OpId::new(3),
        }
    );
}

#[test]
fn unbalanced_loops_are_reported() {
    let parsed = parse_program("FOR_END\n");
    assert_eq!(
        build_graph(parsed.statements, Limits::default()).unwrap_err(),
        BuildError::UnbalancedLoop(LoopImbalance::UnmatchedEnd)
    );

    let parsed = parse_program("FOR_BEGIN\na = f(x)\n");
    assert_eq!(
        build_graph(parsed.statements, Limits::default()).unwrap_err(),
        BuildError::UnbalancedLoop(LoopImbalance::Unclosed { open: 1 })
    );
}

#[test]
fn excessive_nesting_is_reported() {
    let depth = 6;
    let source = format!("{}{}", "FOR_BEGIN\n".repeat(depth), "FOR_END\n".repeat(depth));
    let parsed = parse_program(&source);

    let err = build_graph(parsed.statements.clone(), Limits::new().with_max_loop_depth(5))
        .unwrap_err();
    assert_eq!(err, BuildError::RecursionLimit { depth: 6, limit: 5 });

    let graph = build_graph(parsed.statements, Limits::default()).expect("within default limit");
    let err = Scheduler::new(StableWaves)
        .with_limits(Limits::new().with_max_loop_depth(5))
        .run(graph)
        .unwrap_err();
    assert_eq!(err, ScheduleError::RecursionLimit { depth: 6, limit: 5 });
}

#[test]
fn malformed_lines_are_skipped() {
    let parsed = parse_program("a = f(x)\nnot an op\nb = g x\nc = h(a)\n");
    assert_eq!(parsed.statements.len(), 2);
    assert_eq!(
        parsed.skipped.iter().map(|s| s.line_number).collect::<Vec<_>>(),
        [2, 3]
    );
}

#[test]
fn stable_policy_preserves_admission_order_per_wave() {
    let graph = graph_of("b = f(a)\nc = f(x)\nd = f(b)\n");
    let mut sink: Vec<String> = Vec::new();
    let result = Scheduler::new(StableWaves).run(graph).expect("acyclic");
    sink.accept(result.texts()).expect("vec sink is infallible");
    assert_eq!(sink, ["b = f(a)", "c = f(x)", "d = f(b)"]);
}
