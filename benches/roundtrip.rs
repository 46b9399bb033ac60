use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use parafold::{NumericArrayPattern, Pattern, PatternArray, PatternDict, PsdSymmetricMatrixPattern};

fn model_pattern(groups: usize) -> Pattern {
    let mut dict = PatternDict::new();
    dict.insert("coefs", NumericArrayPattern::new(&[groups, 3])).unwrap();
    dict.insert(
        "covs",
        PatternArray::new(&[groups], PsdSymmetricMatrixPattern::new(3)).unwrap(),
    )
    .unwrap();
    Pattern::from(dict)
}

fn bench_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("free_roundtrip");
    for &groups in &[10usize, 100] {
        let pattern = model_pattern(groups);
        let mut rng = StdRng::seed_from_u64(1);
        let x = pattern.random(&mut rng);
        let free = pattern.flatten(&x, true).unwrap();

        group.bench_with_input(BenchmarkId::new("fold", groups), &groups, |b, _| {
            b.iter(|| pattern.fold(black_box(&free), true).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("flatten", groups), &groups, |b, _| {
            b.iter(|| pattern.flatten(black_box(&x), true).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_roundtrip);
criterion_main!(benches);
