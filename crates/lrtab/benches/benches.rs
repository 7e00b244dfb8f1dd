use std::{env, path::PathBuf};

use criterion::{criterion_group, criterion_main, Criterion};
use lrtab::{
    grammar::Grammar,
    table::{compute, Config},
};
use lrtab_runtime::engine::parse;

criterion_main!(benches);
criterion_group!(benches, bench_generate, bench_parse);

fn load(grammar_name: &str) -> Grammar {
    let project_root = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .expect("missing environment variable: `CARGO_MANIFEST_DIR'");
    Grammar::from_file(project_root.join(format!("tests/{}.grammar", grammar_name))).unwrap()
}

fn bench_generate(c: &mut Criterion) {
    for grammar_name in ["cc", "expr", "expr_ll", "lr1_not_lalr"] {
        bench_table_gen(c, grammar_name);
    }
}

fn bench_table_gen(c: &mut Criterion, grammar_name: &str) {
    let grammar = load(grammar_name);

    let mut group = c.benchmark_group(grammar_name);
    group.bench_function("LR0", |b| {
        b.iter(|| compute(&grammar, Config::new().use_lr0()));
    });
    group.bench_function("SLR", |b| {
        b.iter(|| compute(&grammar, Config::new().use_slr()));
    });
    group.bench_function("LALR", |b| {
        b.iter(|| compute(&grammar, Config::new().use_lalr()));
    });
    group.bench_function("Canonical", |b| {
        b.iter(|| compute(&grammar, Config::new().use_canonical()));
    });
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let grammar = load("expr");
    let generated = compute(&grammar, &Config::new());
    let source = vec!["lparen id plus id rparen star id"; 64].join(" plus ");
    let input = grammar.terminal_sequence(&source).unwrap();

    c.bench_function("parse/expr", |b| {
        b.iter(|| parse(&generated.table, &input));
    });
}
