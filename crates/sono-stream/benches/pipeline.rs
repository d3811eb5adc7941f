use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use sono_core::normalize::normalize;
use sono_stream::fft::FftPipeline;

fn bench_fft(c: &mut Criterion) {
    let mut fft = FftPipeline::new(1024);
    let samples: Vec<f32> = (0..1024).map(|i| (i as f32 * 0.05).sin()).collect();
    let mut out = vec![0.0f32; 1024];
    c.bench_function("fft_1024_db", |b| {
        b.iter(|| fft.process_db(black_box(&samples), &mut out));
    });
}

fn bench_normalize(c: &mut Criterion) {
    // Une fenêtre de classification complète (43 frames de 232 bins).
    let data: Vec<f32> = (0..43 * 232).map(|i| ((i % 97) as f32) - 48.0).collect();
    c.bench_function("normalize_window", |b| {
        b.iter(|| normalize(black_box(&data)));
    });
}

criterion_group!(benches, bench_fft, bench_normalize);
criterion_main!(benches);
