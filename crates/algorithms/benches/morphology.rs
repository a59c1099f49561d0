//! Benchmarks for binary morphology and the spatial filter

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use urbano_algorithms::morphology::{closing, label_components, opening, StructuringElement};
use urbano_algorithms::spatial::{spatial_filter, SpatialFilterParams};
use urbano_core::{Connectivity, GeoTransform, Raster};

fn create_test_mask(size: usize) -> Raster<u8> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64, 30.0, -30.0));
    // Blocky urban pattern with scattered noise
    for row in 0..size {
        for col in 0..size {
            let block = (row / 16 + col / 16) % 3 == 0;
            let noise = (row * 7 + col * 13) % 97 == 0;
            r.set(row, col, u8::from(block || noise)).unwrap();
        }
    }
    r
}

fn bench_closing(c: &mut Criterion) {
    let mut group = c.benchmark_group("morphology/closing");
    let se = StructuringElement::disk(1);
    for size in [256, 512, 1024] {
        let raster = create_test_mask(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| closing(black_box(&raster), &se).unwrap())
        });
    }
    group.finish();
}

fn bench_opening(c: &mut Criterion) {
    let mut group = c.benchmark_group("morphology/opening");
    let se = StructuringElement::disk(1);
    for size in [256, 512, 1024] {
        let raster = create_test_mask(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| opening(black_box(&raster), &se).unwrap())
        });
    }
    group.finish();
}

fn bench_components(c: &mut Criterion) {
    let mut group = c.benchmark_group("morphology/components");
    for size in [256, 512, 1024] {
        let raster = create_test_mask(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| label_components(black_box(&raster), false, Connectivity::Eight))
        });
    }
    group.finish();
}

fn bench_spatial_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial/filter");
    let params = SpatialFilterParams::default();
    for size in [256, 512, 1024] {
        let raster = create_test_mask(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| spatial_filter(black_box(&raster), &params).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_closing,
    bench_opening,
    bench_components,
    bench_spatial_filter
);
criterion_main!(benches);
