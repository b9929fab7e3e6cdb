//! Benchmarks for sheet packing.
//!
//! Measures the guillotine packer, a short genetic search and offcut
//! detection at various part counts.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use u_cutlist_core::{GeneticSettings, Packer};
use u_cutlist_packing::{
    detect_offcuts, Algorithm, GeneticPacker, GuillotinePacker, Part, Settings, StockSheet,
};

fn mixed_parts(n: usize) -> Vec<Part> {
    (0..n)
        .map(|i| {
            let w = 120.0 + (i as f64 * 37.0) % 480.0;
            let h = 80.0 + (i as f64 * 53.0) % 360.0;
            Part::new(format!("P{}", i), w, h)
        })
        .collect()
}

fn stock() -> Vec<StockSheet> {
    vec![StockSheet::new("S", 2440.0, 1220.0).with_quantity(50)]
}

fn bench_guillotine(c: &mut Criterion) {
    let mut group = c.benchmark_group("guillotine");
    let stocks = stock();
    let settings = Settings::new().with_kerf(3.0);
    let packer = GuillotinePacker::new();

    for &n in &[20, 80, 200] {
        let parts = mixed_parts(n);
        group.bench_with_input(BenchmarkId::new("parts", n), &parts, |b, p| {
            b.iter(|| black_box(packer.pack(black_box(p), &stocks, &settings)))
        });
    }
    group.finish();
}

fn bench_genetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("genetic");
    group.sample_size(10);
    let stocks = stock();
    let settings = Settings::new()
        .with_kerf(3.0)
        .with_algorithm(Algorithm::GeneticSearch)
        .with_genetic(
            GeneticSettings::default()
                .with_population_size(20)
                .with_generations(10)
                .with_seed(7),
        );
    let packer = GeneticPacker::new();

    for &n in &[20, 60] {
        let parts = mixed_parts(n);
        group.bench_with_input(BenchmarkId::new("parts", n), &parts, |b, p| {
            b.iter(|| black_box(packer.pack(black_box(p), &stocks, &settings)))
        });
    }
    group.finish();
}

fn bench_offcuts(c: &mut Criterion) {
    let parts = mixed_parts(80);
    let result = GuillotinePacker::new()
        .pack(&parts, &stock(), &Settings::new().with_kerf(3.0))
        .expect("pack");
    c.bench_function("offcuts_80_parts", |b| {
        b.iter(|| black_box(detect_offcuts(black_box(&result), 3.0)))
    });
}

criterion_group!(benches, bench_guillotine, bench_genetic, bench_offcuts);
criterion_main!(benches);
