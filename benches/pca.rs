use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dsutils::decomposition::PcaTransformer;
use dsutils::frame::{DataFrame, Value};
use dsutils::utils::{compute_hash, HashAlgorithm};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_frame(rows: usize, cols: usize) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(7);
    let names: Vec<String> = (0..cols).map(|i| format!("x{i}")).collect();
    let data = (0..rows)
        .map(|_| (0..cols).map(|_| Value::Float(rng.gen_range(-1.0..1.0))).collect())
        .collect();
    DataFrame::from_rows(names, data).unwrap()
}

fn bench_pca(c: &mut Criterion) {
    let frame = random_frame(1000, 20);
    c.bench_function("pca_fit_1000x20", |b| {
        b.iter(|| {
            let mut pca = PcaTransformer::new(3);
            pca.fit(black_box(&frame)).unwrap();
        })
    });

    let mut pca = PcaTransformer::new(3);
    pca.fit(&frame).unwrap();
    c.bench_function("pca_transform_1000x20", |b| {
        b.iter(|| pca.transform(black_box(&frame)).unwrap())
    });
}

fn bench_hash(c: &mut Criterion) {
    let chunks: Vec<Vec<u8>> = (0..256).map(|i| vec![i as u8; 4096]).collect();
    for algorithm in [HashAlgorithm::Sha256, HashAlgorithm::Blake3] {
        c.bench_function(&format!("hash_1mib_{algorithm}"), |b| {
            b.iter(|| {
                let stream = chunks.iter().map(|c| Ok::<_, std::io::Error>(c.as_slice()));
                compute_hash(stream, algorithm).unwrap()
            })
        });
    }
}

criterion_group!(benches, bench_pca, bench_hash);
criterion_main!(benches);
