// workspace_search.rs - Benchmarks for workspace indexing, symbol search and include traversal
//
// Run with: cargo bench --bench workspace_search --features test-support
// Compare baselines: cargo bench --bench workspace_search --features test-support -- --baseline before

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use frugal_ls::state::WorldState;
use frugal_ls::symbols::SymbolKind;
use frugal_ls::test_utils::fixture_workspace::{
    fixture_uri, generate_fixture_workspace, open_fixture_workspace, FixtureConfig,
};

const PRESETS: &[(&str, fn() -> FixtureConfig)] = &[
    ("small", FixtureConfig::small),
    ("medium", FixtureConfig::medium),
    ("large", FixtureConfig::large),
];

/// Opening a whole workspace: parse, graph update and indexing per file
fn bench_open_workspace(c: &mut Criterion) {
    let mut group = c.benchmark_group("open_workspace");
    group.sample_size(20);

    for (label, preset) in PRESETS {
        let config = preset();
        let files = generate_fixture_workspace(&config);
        group.bench_with_input(BenchmarkId::new("open_all", *label), &files, |b, files| {
            b.iter(|| {
                let state = WorldState::default();
                for file in files {
                    state.open_document(file.uri.clone(), &file.text, 1).unwrap();
                }
                black_box(state.index_statistics())
            })
        });
    }

    group.finish();
}

fn bench_symbol_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("symbol_search");

    for (label, preset) in PRESETS {
        let config = preset();
        let state = WorldState::default();
        open_fixture_workspace(&state, &config);

        for query in ["", "item_1", "service", "id"] {
            group.bench_with_input(
                BenchmarkId::new(format!("search/{:?}", query), *label),
                &state,
                |b, state| b.iter(|| black_box(state.workspace_symbol_search(black_box(query), 256))),
            );
        }

        group.bench_with_input(
            BenchmarkId::new("search_by_type/service", *label),
            &state,
            |b, state| {
                b.iter(|| {
                    black_box(
                        state
                            .symbol_index
                            .search_by_type(&[SymbolKind::Service], black_box(""), 0),
                    )
                })
            },
        );
    }

    group.finish();
}

fn bench_include_traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("include_traversal");

    for (label, preset) in PRESETS {
        let config = preset();
        let state = WorldState::default();
        open_fixture_workspace(&state, &config);
        let head = fixture_uri(0);
        let tail = fixture_uri(config.include_chain_depth.min(config.file_count - 1));

        group.bench_with_input(
            BenchmarkId::new("transitive_symbols", *label),
            &(&state, &head),
            |b, &(state, uri)| b.iter(|| black_box(state.transitive_symbols(black_box(uri)))),
        );

        group.bench_with_input(
            BenchmarkId::new("has_circular_dependency", *label),
            &(&state, &head, &tail),
            |b, &(state, from, to)| {
                b.iter(|| {
                    black_box(
                        state
                            .dependency_graph
                            .has_circular_dependency(black_box(from), black_box(to)),
                    )
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_open_workspace,
    bench_symbol_search,
    bench_include_traversal,
);
criterion_main!(benches);
