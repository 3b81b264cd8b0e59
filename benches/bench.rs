//! Criterion benchmarks for textquery.
//!
//! Covers term compilation (cold versus cached), boolean query evaluation
//! over generated lines, and parsing.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use rayon::prelude::*;
use textquery::query::{
    PatternCache, QueryOptions, QueryParser, TermPatternCache, TextQuery,
};

/// Generate test lines for benchmarking.
fn generate_test_lines(count: usize) -> Vec<String> {
    let words = [
        "title:", "author:", "cat", "catalog", "bobcat", "dog", "bird", "big", "red", "green",
        "sat", "on", "the", "mat", "concatenate", "colour", "color", "query", "term", "phrase",
    ];

    let mut lines = Vec::with_capacity(count);
    for i in 0..count {
        let line_length = 5 + (i % 20); // Variable length lines
        let mut line_words = Vec::with_capacity(line_length);

        for j in 0..line_length {
            let word_idx = (i * 7 + j * 13) % words.len(); // Pseudo-random distribution
            line_words.push(words[word_idx]);
        }

        lines.push(line_words.join(" "));
    }

    lines
}

/// Benchmark compiling terms against a cold cache versus fetching them.
fn bench_pattern_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_cache");
    let delimiter = "(?: )";

    group.bench_function("compile_cold", |b| {
        b.iter_with_setup(TermPatternCache::new, |cache| {
            let compiled = cache.compile_or_fetch(black_box("2~cat~"), delimiter, false);
            black_box(compiled)
        })
    });

    let cache = TermPatternCache::new();
    cache
        .compile_or_fetch("2~cat~", delimiter, false)
        .expect("term compiles");
    group.bench_function("fetch_cached", |b| {
        b.iter(|| black_box(cache.compile_or_fetch(black_box("2~cat~"), delimiter, false)))
    });

    group.finish();
}

/// Benchmark evaluating queries over many lines.
fn bench_query_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_evaluation");
    let lines = generate_test_lines(1000);
    group.throughput(Throughput::Elements(lines.len() as u64));

    for (name, text) in [
        ("single_term", "cat"),
        ("fuzzy_term", "~cat~"),
        ("boolean", "(cat OR dog) AND NOT bird"),
        ("phrase", "\"the mat\" OR big~"),
        ("field", "title:(cat OR catalog)"),
    ] {
        let query = TextQuery::with_query(text, QueryOptions::default())
            .expect("query parses")
            .with_cache(Arc::new(TermPatternCache::new()));

        group.bench_function(name, |b| {
            b.iter(|| {
                lines
                    .iter()
                    .filter(|line| query.eval(black_box(line)).unwrap_or(false))
                    .count()
            })
        });
    }

    let query = TextQuery::with_query("(cat OR dog) AND NOT bird", QueryOptions::default())
        .expect("query parses");
    group.bench_function("boolean_parallel", |b| {
        b.iter(|| {
            lines
                .par_iter()
                .filter(|line| query.eval(black_box(line)).unwrap_or(false))
                .count()
        })
    });

    group.finish();
}

/// Benchmark parsing query strings.
fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");
    let parser = QueryParser::new();

    group.bench_function("parse_nested", |b| {
        b.iter(|| {
            let node = parser.parse(black_box(
                "title:\"big cat\" AND (~dog~ OR /colou?r/) -bird 2~cat~3",
            ));
            black_box(node)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_pattern_cache,
    bench_query_evaluation,
    bench_parsing
);

criterion_main!(benches);
