use std::time::Duration;

use crftagger::{Lattice, PairScores, TagSet};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const NUM_TAGS: usize = 23;
const LEN: usize = 40;

fn tagset() -> TagSet {
    let mut tags = TagSet::new();
    for i in 0..NUM_TAGS {
        tags.add(&format!("T{i}"), (NUM_TAGS - i) as u64);
    }
    tags
}

/// Per-position pair scores from a fixed linear congruential sequence.
fn scores() -> Vec<PairScores> {
    let mut seed: u64 = 0x2545_f491;
    let mut next = move || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((seed >> 33) as f64 / (1u64 << 31) as f64) - 0.5
    };
    (0..=LEN)
        .map(|_| {
            let mut s = PairScores::new(NUM_TAGS);
            for prev in 0..=NUM_TAGS {
                for curr in 0..=NUM_TAGS {
                    s.add(prev, curr, next());
                }
            }
            s
        })
        .collect()
}

fn decode(lattice: &mut Lattice, tags: &TagSet, scores: &[PairScores], path: &mut Vec<usize>) -> f64 {
    lattice.reset();
    for s in &scores[..LEN] {
        lattice.viterbi(tags, s).unwrap();
    }
    lattice.terminate(tags, &scores[LEN]).unwrap();
    lattice.best_path(path).unwrap()
}

fn viterbi_benchmark(c: &mut Criterion) {
    let tags = tagset();
    let scores = scores();
    let mut lattice = Lattice::new(NUM_TAGS, LEN);
    let mut path = Vec::with_capacity(LEN);
    c.bench_function("viterbi", |b| b.iter(|| decode(&mut lattice, &tags, black_box(&scores), &mut path)));
}

criterion_group! {
    name = benchmarks;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = viterbi_benchmark
}

criterion_main!(benchmarks);
