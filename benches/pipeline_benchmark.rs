use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use corebox::border::BorderCropper;
use corebox::clustering::MeanShift;
use corebox::scale_bar::ScaleBarMeasurer;
use corebox::types::{BorderConfig, ScaleBarConfig};
use corebox::LargestRegionSelector;
use image::{Rgb, RgbImage};

fn synthetic_photo(width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::new(width, height);
    let (top, bottom) = (height / 8, height - height / 8);
    for y in top..bottom {
        for x in width / 7..width * 4 / 7 {
            img.put_pixel(x, y, Rgb([150, 100, 60]));
        }
    }

    let tick = (bottom - top) / 10;
    for y in top..top + tick * 10 {
        let color = if ((y - top) / tick) % 2 == 0 { [255, 255, 255] } else { [127, 127, 127] };
        for x in width / 35..width / 35 + tick {
            img.put_pixel(x, y, Rgb(color));
        }
    }
    img
}

fn benchmark_mean_shift(c: &mut Criterion) {
    let mut group = c.benchmark_group("mean_shift_rows");

    for n in [20usize, 100, 400] {
        let tops: Vec<f64> = (0..n).map(|i| ((i % 4) * 120) as f64 + (i % 7) as f64).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &tops, |b, tops| {
            let ms = MeanShift::new(10.0);
            b.iter(|| ms.fit_1d(black_box(tops)))
        });
    }

    group.finish();
}

fn benchmark_border_crop(c: &mut Criterion) {
    let mut group = c.benchmark_group("border_crop");
    group.sample_size(20);

    let cropper = BorderCropper::new(BorderConfig::default(), Arc::new(LargestRegionSelector));
    for (w, h) in [(700u32, 300u32), (1400, 600)] {
        let img = synthetic_photo(w, h);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{w}x{h}")), &img, |b, img| {
            b.iter(|| cropper.crop(black_box(img)).expect("crop failed"))
        });
    }

    group.finish();
}

fn benchmark_scale_bar(c: &mut Criterion) {
    let mut group = c.benchmark_group("scale_bar");
    group.sample_size(20);

    let measurer =
        ScaleBarMeasurer::new(ScaleBarConfig::default(), Arc::new(LargestRegionSelector));
    let img = synthetic_photo(700, 300);
    group.bench_function("700x300", |b| {
        b.iter(|| measurer.measure(black_box(&img)).expect("scale bar not found"))
    });

    group.finish();
}

criterion_group!(benches, benchmark_mean_shift, benchmark_border_crop, benchmark_scale_bar);
criterion_main!(benches);
