//! Benchmarks for the sheetsmith pipeline.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{Rgba, RgbaImage};
use tempfile::TempDir;

use sheetsmith::{layout, Algorithm, Coordinator, Manifest, SpriteConfig};

/// Deterministic mix of icon-like sizes.
fn sizes(count: usize) -> Vec<(u32, u32)> {
    (0..count)
        .map(|i| {
            let w = 8 + (i * 7 % 57) as u32;
            let h = 8 + (i * 13 % 41) as u32;
            (w, h)
        })
        .collect()
}

// -- Layout benchmarks --

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");

    for count in [16, 256] {
        let items = sizes(count);
        for algorithm in Algorithm::ALL {
            group.bench_with_input(
                BenchmarkId::new(algorithm.name(), count),
                &items,
                |b, items| b.iter(|| layout(algorithm, black_box(items), 2)),
            );
        }
    }

    group.finish();
}

// -- Full pass benchmarks --

fn project(count: usize) -> (TempDir, Arc<SpriteConfig>) {
    let dir = tempfile::tempdir().unwrap();
    let sprites = dir.path().join("app/assets/images/sprites");
    std::fs::create_dir_all(&sprites).unwrap();

    for (i, (w, h)) in sizes(count).into_iter().enumerate() {
        RgbaImage::from_pixel(w, h, Rgba([i as u8, 64, 128, 255]))
            .save(sprites.join(format!("sprite-{i}.png")))
            .unwrap();
    }

    let mut config = SpriteConfig::from_manifest(Manifest::default()).unwrap();
    config.root = dir.path().to_path_buf();
    config.output.public_dir = dir.path().join("public");
    (dir, Arc::new(config))
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");
    group.sample_size(20);

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (_dir, config) = project(32);

    group.bench_function("generate_32_sprites", |b| {
        b.iter(|| {
            let coordinator: Coordinator<()> = Coordinator::new(Arc::clone(&config));
            runtime.block_on(coordinator.acquire((), "bench.styl")).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_layout, bench_generation);
criterion_main!(benches);
