//! Compile pipeline benchmarks.
//!
//! Run with the `profiling` feature to get per-phase scopes in an attached
//! profiler:
//!
//! ```bash
//! cargo bench --features profiling
//! ```

use bumpalo::Bump;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sable::prelude::*;
use sable::{Catalog, TypeCatalog};
use sable_syntax::ParseOptions;
use std::hint::black_box;

const HELLO: &str = include_str!("../test_scripts/hello.sable");
const FUNCTIONS: &str = include_str!("../test_scripts/functions.sable");
const COLLECTIONS: &str = include_str!("../test_scripts/collections.sable");

/// A script of `count` small functions and a loop calling each one.
fn generated_script(count: usize) -> String {
    let mut source = String::new();
    for n in 0..count {
        source.push_str(&format!(
            "int f{n}(int x) {{\n    int y = x * {n} + 1;\n    if (y > 100 && x != 0) {{\n        return y - x;\n    }}\n    return y;\n}}\n"
        ));
    }
    source.push_str("int total = 0;\nfor (int i = 0; i < 10; i++) {\n");
    for n in 0..count {
        source.push_str(&format!("    total += f{n}(i);\n"));
    }
    source.push_str("}\ntotal\n");
    source
}

fn script_benchmarks(c: &mut Criterion) {
    let compiler = ScriptCompiler::with_standard_library().unwrap();
    let interface = ScriptInterface::generic();

    let mut group = c.benchmark_group("compile/scripts");
    for (name, source) in [("hello", HELLO), ("functions", FUNCTIONS), ("collections", COLLECTIONS)] {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| {
                let unit = compiler.compile(name, black_box(source), &interface).unwrap();
                black_box(unit.functions.len())
            });
        });
    }
    group.finish();
}

fn size_benchmarks(c: &mut Criterion) {
    let compiler = ScriptCompiler::with_standard_library().unwrap();
    let interface = ScriptInterface::generic();

    let mut group = c.benchmark_group("compile/sizes");
    for count in [10, 100, 500] {
        let source = generated_script(count);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &source, |b, source| {
            b.iter(|| {
                let unit = compiler.compile("generated", black_box(source), &interface).unwrap();
                black_box(unit.constants.len())
            });
        });
    }
    group.finish();
}

/// Parsing alone, to separate front end cost from compilation.
fn parse_benchmarks(c: &mut Criterion) {
    let catalog = Catalog::standard().unwrap();
    let is_type = |text: &str| catalog.is_valid_type_name(text);
    let source = generated_script(100);

    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("generated_100", |b| {
        b.iter(|| {
            let arena = Bump::new();
            let tree = sable_syntax::parse(black_box(&source), &arena, &is_type, ParseOptions::default()).unwrap();
            black_box(tree.node_count())
        });
    });
    group.finish();
}

fn settings_benchmarks(c: &mut Criterion) {
    let interface = ScriptInterface::generic();
    let counted = ScriptCompiler::with_standard_library().unwrap();
    let uncounted = counted
        .clone()
        .with_settings(CompilerSettings::default().with_max_loop_counter(0));

    let mut group = c.benchmark_group("compile/loop_counter");
    group.bench_function("counted", |b| {
        b.iter(|| black_box(counted.compile("f", black_box(FUNCTIONS), &interface).unwrap()))
    });
    group.bench_function("uncounted", |b| {
        b.iter(|| black_box(uncounted.compile("f", black_box(FUNCTIONS), &interface).unwrap()))
    });
    group.finish();
}

criterion_group!(
    benches,
    script_benchmarks,
    size_benchmarks,
    parse_benchmarks,
    settings_benchmarks
);
criterion_main!(benches);
