use criterion::{black_box, criterion_group, criterion_main, Criterion};
use databases::mca::McaCache;

pub fn criterion_benchmark(c: &mut Criterion) {
    let cache = McaCache::new();
    c.bench_function("10 machine check decodes", |b| {
        b.iter(|| {
            let test_errors = black_box([
                (5_u64, 0xbea0_0000_0000_0108_u64),
                (0, 0xdc20_0000_0014_0175),
                (1, 0x9400_0000_000d_0150),
                (2, 0x9820_0000_0002_0179),
                (6, 0xbc00_0000_0003_0c0f),
                (10, 0x9c20_0000_0004_0136),
                (15, 0x9c00_0000_0000_0000),
                (20, 0xd420_0000_0008_0b0b),
                (22, 0x9c00_0000_0002_0001),
                (30, 0x0000_0000_0000_0000),
            ]);
            for (bank, status) in test_errors {
                black_box(cache.decode(bank, status));
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
