//! Benchmarks for the hot paths: rectangle packing and the SDF sweep

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tessera::tessera_atlas::sdf::convert_to_signed_distance_field;
use tessera::RectPacker;

fn bench_packing(c: &mut Criterion) {
    c.bench_function("pack_1024_uniform_glyphs", |b| {
        b.iter(|| {
            let mut packer = RectPacker::new(512, 512);
            let mut placed = 0u32;
            for _ in 0..1024 {
                if packer.add(black_box(10), black_box(10)).is_some() {
                    placed += 1;
                }
            }
            black_box(placed)
        });
    });

    c.bench_function("pack_mixed_sizes", |b| {
        b.iter(|| {
            let mut packer = RectPacker::new(1024, 1024);
            for i in 0u32..512 {
                let w = 6 + (i * 7) % 40;
                let h = 6 + (i * 13) % 40;
                black_box(packer.add(w, h));
            }
        });
    });
}

fn bench_sdf(c: &mut Criterion) {
    // A filled circle gives the sweeps realistic propagation work.
    let size = 256usize;
    let mut source = vec![0u8; size * size];
    let center = size as f32 / 2.0;
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            if (dx * dx + dy * dy).sqrt() < 80.0 {
                source[y * size + x] = 255;
            }
        }
    }

    c.bench_function("sdf_256x256_circle", |b| {
        b.iter(|| {
            let mut pixels = source.clone();
            convert_to_signed_distance_field(&mut pixels, size as u32, size as u32);
            black_box(pixels)
        });
    });
}

criterion_group!(benches, bench_packing, bench_sdf);
criterion_main!(benches);
