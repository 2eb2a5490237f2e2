use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use idphoto::{
    AlphaRefiner, BackgroundColor, BasicEnhancer, ClassicalSegmenter, Compositor, EnhanceOptions,
};
use image::{Rgb, RgbImage, Rgba, RgbaImage};

const SIZES: [(u32, u32); 3] = [(300, 400), (600, 800), (1200, 1600)];

/// Light backdrop with a dark elliptical subject
fn synthetic_portrait(width: u32, height: u32) -> RgbImage {
    let (cx, cy) = (width as f32 / 2.0, height as f32 * 0.55);
    let (rx, ry) = (width as f32 * 0.3, height as f32 * 0.4);
    RgbImage::from_fn(width, height, |x, y| {
        let dx = (x as f32 - cx) / rx;
        let dy = (y as f32 - cy) / ry;
        if dx * dx + dy * dy < 1.0 {
            Rgb([80, 60, 50])
        } else {
            Rgb([230, 232, 235])
        }
    })
}

fn synthetic_cutout(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let alpha = if (x + y) % 7 == 0 { 128 } else { 255 };
        Rgba([(x % 256) as u8, (y % 256) as u8, 90, alpha])
    })
}

fn bench_classical_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("classical_segmentation");
    group.sample_size(10);
    let segmenter = ClassicalSegmenter::default();

    for (width, height) in SIZES {
        let image = synthetic_portrait(width, height);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &image,
            |b, image| b.iter(|| segmenter.compute_mask(black_box(image)).unwrap()),
        );
    }
    group.finish();
}

fn bench_composition(c: &mut Criterion) {
    let mut group = c.benchmark_group("composition");
    let compositor = Compositor::default();
    let color = BackgroundColor::parse("#438EDB").unwrap();

    for (width, height) in SIZES {
        let cutout = synthetic_cutout(width, height);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &cutout,
            |b, cutout| b.iter(|| compositor.compose_with(black_box(cutout), color, (295, 413)).unwrap()),
        );
    }
    group.finish();
}

fn bench_refine_and_enhance(c: &mut Criterion) {
    let mut group = c.benchmark_group("post_processing");
    let canvas = synthetic_cutout(295, 413);
    let refiner = AlphaRefiner::default();
    let options = EnhanceOptions::default();

    group.bench_function("alpha_refine", |b| {
        b.iter(|| refiner.refine(black_box(canvas.clone())));
    });
    group.bench_function("basic_enhance", |b| {
        b.iter(|| BasicEnhancer.apply(black_box(&canvas), &options));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_classical_segmentation,
    bench_composition,
    bench_refine_and_enhance
);
criterion_main!(benches);
