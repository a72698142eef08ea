//! # Categorical Model Benchmark

use chrono::Utc;
use criterion::{criterion_group, criterion_main, Criterion};
use image::{DynamicImage, RgbImage};
use serde_json::json;

use drive_lib::{
    pilot::{CategoricalModel, InferenceModel},
    vision::Frame,
};

/// Deterministic weights in `[-0.5, 0.5)`.
fn weights(num_outputs: usize, num_inputs: usize, seed: usize) -> Vec<Vec<f64>> {
    (0..num_outputs)
        .map(|o| {
            (0..num_inputs)
                .map(|i| ((o * 31 + i * 17 + seed) % 100) as f64 / 100.0 - 0.5)
                .collect()
        })
        .collect()
}

fn model_benchmark(c: &mut Criterion) {
    // ---- Build a model the size of the one used on the rover ----

    let (width, height, bins, hidden) = (32, 24, 15, 64);

    let model_json = json!({
        "input_width": width,
        "input_height": height,
        "angle_bins": bins,
        "layers": [
            {
                "weights": weights(hidden, width * height, 1),
                "biases": vec![0.0; hidden],
                "activation": "relu"
            },
            {
                "weights": weights(bins + 1, hidden, 2),
                "biases": vec![0.0; bins + 1],
                "activation": "linear"
            }
        ]
    });

    let model = CategoricalModel::from_json(&model_json.to_string()).unwrap();

    // A camera sized frame with a gradient so the resize has work to do
    let frame = Frame {
        timestamp: Utc::now(),
        image: DynamicImage::ImageRgb8(RgbImage::from_fn(160, 120, |x, y| {
            image::Rgb([x as u8, y as u8, (x + y) as u8])
        })),
    };

    c.bench_function("categorical_model_predict", |b| {
        b.iter(|| model.predict(&frame).unwrap())
    });
}

criterion_group!(benches, model_benchmark);
criterion_main!(benches);
