//! Terminal presentation benchmark: encode and flush one bitmap per pane.
//!
//! Target: < 2ms for a 80x45 cell pane.

use bitmap_relay::target::Surface;
use bitmap_relay::terminal::{Region, TerminalSurface};
use bitmap_relay::{Bitmap, Resolution, Rgb};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::io;

fn gradient(resolution: Resolution) -> Bitmap {
    let mut bitmap = Bitmap::new(resolution);
    for y in 0..resolution.height {
        for x in 0..resolution.width {
            bitmap.set(x, y, Rgb::new((x % 256) as u8, (y % 256) as u8, 96));
        }
    }
    bitmap
}

fn present_uniform(c: &mut Criterion) {
    let mut surface = TerminalSurface::new(Region::new(0, 0, 80, 45), io::sink());

    c.bench_function("present_80x45_uniform", |b| {
        b.iter(|| {
            surface.present(black_box(Bitmap::filled(Resolution::new(160, 90), Rgb::new(30, 60, 90))));
        })
    });
}

fn present_various_panes(c: &mut Criterion) {
    let mut group = c.benchmark_group("present_gradient");

    for (width, height) in [(40, 12), (80, 24), (120, 40), (200, 50)] {
        let source = gradient(Resolution::new(640, 480));
        let mut surface = TerminalSurface::new(Region::new(0, 0, width, height), io::sink());
        group.bench_with_input(
            BenchmarkId::new("pane", format!("{width}x{height}")),
            &(),
            |b, ()| {
                b.iter(|| {
                    surface.present(black_box(source.resample(source.resolution())));
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, present_uniform, present_various_panes);
criterion_main!(benches);
