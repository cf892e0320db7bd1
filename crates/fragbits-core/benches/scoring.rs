//! Criterion benchmarks for the similarity scoring hot path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fragbits_core::similarity::{batch_scores, corrections, score};
use fragbits_core::Fingerprint;

const NUMBER_OF_BITS: u32 = 574_331;
const ONBITS_PER_FINGERPRINT: usize = 400;

fn random_fingerprint(rng: &mut StdRng) -> Fingerprint {
    Fingerprint::from_positions(
        (0..ONBITS_PER_FINGERPRINT).map(|_| rng.gen_range(0..NUMBER_OF_BITS)),
    )
}

fn bench_score_pair(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let fp_a = random_fingerprint(&mut rng);
    let fp_b = random_fingerprint(&mut rng);
    let corr = corrections(0.0007);

    c.bench_function("score_pair", |bencher| {
        bencher.iter(|| {
            black_box(score(
                black_box(&fp_a),
                black_box(&fp_b),
                NUMBER_OF_BITS,
                corr,
            ))
        })
    });
}

fn bench_batch_scores(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let fps: Vec<(String, Fingerprint)> = (0..200)
        .map(|i| (format!("frag{i}"), random_fingerprint(&mut rng)))
        .collect();
    let corr = corrections(0.0007);

    c.bench_function("batch_scores_200", |bencher| {
        bencher.iter(|| {
            black_box(batch_scores(
                black_box(&fps),
                black_box(&fps),
                NUMBER_OF_BITS,
                corr,
                0.45,
                true,
            ))
        })
    });
}

criterion_group!(benches, bench_score_pair, bench_batch_scores);
criterion_main!(benches);
