//! Benchmark for ink-mask construction and overlay classification.
//!
//! Run with: cargo bench --bench inkmask_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ddc_common::SimilarityTransform;
use ddc_overlay_compositor::{classify, ComposeParams, InkMask, MaskParams};
use ddc_raster_gateway::{Channels, Raster};

fn line_drawing(size: u32) -> Raster {
    let mut pixels = vec![255u8; (size * size * 4) as usize];
    for y in 0..size {
        for x in 0..size {
            if x % 40 < 2 || y % 40 < 2 {
                let idx = ((y * size + x) as usize) * 4;
                pixels[idx..idx + 4].copy_from_slice(&[0, 0, 0, 255]);
            }
        }
    }
    Raster::new(size, size, Channels::Rgba, pixels, 1.0)
}

fn bench_mask_from_raster(c: &mut Criterion) {
    let mut group = c.benchmark_group("ink_mask");
    for size in [256u32, 512, 1024] {
        let raster = line_drawing(size);
        let params = MaskParams::default();
        group.bench_with_input(BenchmarkId::new("from_raster", size), &size, |b, _| {
            b.iter(|| {
                let mask = InkMask::from_raster(black_box(&raster), black_box(&params));
                black_box(mask);
            });
        });
    }
    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlay_classify");
    for size in [256u32, 512] {
        let old = line_drawing(size);
        let new = line_drawing(size);
        let params = ComposeParams::default();
        group.bench_with_input(BenchmarkId::new("classify", size), &size, |b, _| {
            b.iter(|| {
                let result = classify(black_box(&old), black_box(&new), &SimilarityTransform::IDENTITY, &params);
                black_box(result.unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_mask_from_raster, bench_classify);
criterion_main!(benches);
