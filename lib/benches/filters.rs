use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use painting_restoration as pr;
use rand::SeedableRng;

fn painting(dim: u32) -> pr::image::RgbImage {
    pr::SyntheticArt::new()
        .dims(pr::Dims::new(dim * 3 / 2, dim))
        .paint(&mut rand_pcg::Pcg32::seed_from_u64(120))
}

fn edge_map(c: &mut Criterion) {
    static DIM: u32 = 64;

    let mut group = c.benchmark_group("edge_map");
    group.sample_size(10);

    for dim in [DIM, 2 * DIM, 4 * DIM, 8 * DIM].iter() {
        let img = pr::image::DynamicImage::ImageRgb8(painting(*dim));
        let detector = pr::EdgeDetector::new();

        group.bench_with_input(BenchmarkId::from_parameter(dim), &img, |b, img| {
            b.iter(|| black_box(detector.edge_map(img).unwrap()));
        });
    }
    group.finish();
}

fn enhance(c: &mut Criterion) {
    static DIM: u32 = 64;

    let mut group = c.benchmark_group("enhance");
    group.sample_size(10);

    for dim in [DIM, 2 * DIM, 4 * DIM, 8 * DIM].iter() {
        let img = painting(*dim);
        let enhancer = pr::Enhancer::new();

        group.bench_with_input(BenchmarkId::from_parameter(dim), &img, |b, img| {
            b.iter(|| black_box(enhancer.enhance(img.clone()).unwrap()));
        });
    }
    group.finish();
}

fn restore(c: &mut Criterion) {
    let restorer = pr::Restorer::new(pr::ContextEncoderConfig::new(), "does/not/exist.bin").unwrap();
    let img = pr::image::DynamicImage::ImageRgb8(painting(256));

    let mut group = c.benchmark_group("restore");
    group.sample_size(10);
    group.bench_function("256x384", |b| {
        b.iter(|| black_box(restorer.restore(&img).unwrap()));
    });
    group.finish();
}

criterion_group!(benches, edge_map, enhance, restore);
criterion_main!(benches);
