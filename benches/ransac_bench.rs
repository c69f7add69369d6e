//! Benchmark for the RANSAC similarity-estimation inner loop.
//!
//! Run with: cargo bench --bench ransac_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ddc_feature_similarity::{align, AlignConfig};
use ddc_raster_gateway::{Channels, Raster};

fn checkerboard(size: u32) -> Raster {
    let mut pixels = vec![255u8; (size * size * 4) as usize];
    for y in 0..size {
        for x in 0..size {
            if (x / 16 + y / 16) % 2 == 0 {
                let idx = ((y * size + x) as usize) * 4;
                pixels[idx..idx + 4].copy_from_slice(&[10, 10, 10, 255]);
            }
        }
    }
    Raster::new(size, size, Channels::Rgba, pixels, 1.0)
}

fn bench_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("align");
    for size in [256u32, 512, 1024] {
        let old = checkerboard(size);
        let new = checkerboard(size);
        group.bench_with_input(BenchmarkId::new("checkerboard", size), &size, |b, _| {
            b.iter(|| {
                let result = align(black_box(&old), black_box(&new), &AlignConfig::default());
                black_box(result);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_align);
criterion_main!(benches);
