//! Benchmarks for scoring and ranking.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tajy_search::{phonetic_key, rank_candidates, score, Candidate, PRIMARY_THRESHOLD};

const FIRST: [&str; 8] = ["Ana", "Juan", "María", "Luis", "Carlos", "Rosa", "Pedro", "Lucía"];
const LAST: [&str; 8] = [
    "Benítez", "Gómez", "González", "Ortiz", "Ruiz", "Núñez", "Villalba", "Duarte",
];

fn create_candidates(count: usize) -> Vec<Candidate> {
    (0..count)
        .map(|i| {
            let name = format!(
                "{} {} {}",
                FIRST[i % FIRST.len()],
                LAST[(i / FIRST.len()) % LAST.len()],
                LAST[i % LAST.len()]
            );
            Candidate::new(name, format!("S-{i:05}"))
        })
        .collect()
}

fn bench_score_tiers(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");

    group.bench_function("prefix", |b| {
        b.iter(|| score(black_box("maria"), black_box("María Gómez Ruiz")))
    });
    group.bench_function("phonetic", |b| {
        b.iter(|| score(black_box("gonzales"), black_box("González")))
    });
    group.bench_function("no_match", |b| {
        b.iter(|| score(black_box("juan"), black_box("Villalba Duarte")))
    });

    group.finish();
}

fn bench_phonetic_key(c: &mut Criterion) {
    c.bench_function("phonetic_key", |b| {
        b.iter(|| phonetic_key(black_box("Ximena Villalba Núñez")))
    });
}

fn bench_rank_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_candidates");

    for size in [100, 1000, 10000].iter() {
        let candidates = create_candidates(*size);

        group.bench_with_input(BenchmarkId::new("gonzales", size), size, |b, _| {
            b.iter(|| {
                rank_candidates(
                    black_box("gonzales"),
                    black_box(&candidates),
                    PRIMARY_THRESHOLD,
                )
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_score_tiers,
    bench_phonetic_key,
    bench_rank_candidates
);
criterion_main!(benches);
