use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use insurance_pipeline::evaluation::regression_metrics;
use insurance_pipeline::training::{ModelConfiguration, ModelTrainer};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_regression_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.gen::<f64>() * 10.0);

    // Create target as sum of features + noise
    let y = x
        .rows()
        .into_iter()
        .map(|r| r.sum() + rng.gen::<f64>() * 0.1)
        .collect();
    (x, y)
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    let forest = ModelConfiguration::RandomForest {
        n_estimators: 50,
        max_depth: 8,
        random_state: 42,
    };

    for n_rows in [500, 1000, 2000].iter() {
        let (x, y) = create_regression_data(*n_rows, 11);

        group.bench_with_input(BenchmarkId::new("linear", n_rows), &(&x, &y), |b, (x, y)| {
            b.iter(|| {
                ModelTrainer::new()
                    .train(&ModelConfiguration::Linear, black_box(x), black_box(y))
                    .unwrap()
            })
        });

        group.bench_with_input(BenchmarkId::new("random-forest", n_rows), &(&x, &y), |b, (x, y)| {
            b.iter(|| ModelTrainer::new().train(&forest, black_box(x), black_box(y)).unwrap())
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train model once
    let (x_train, y_train) = create_regression_data(2000, 11);
    let config = ModelConfiguration::RandomForest {
        n_estimators: 50,
        max_depth: 8,
        random_state: 42,
    };
    let model = ModelTrainer::new().train(&config, &x_train, &y_train).unwrap();

    for n_rows in [100, 1000, 10000].iter() {
        let (x, y) = create_regression_data(*n_rows, 11);

        group.bench_with_input(BenchmarkId::new("predict", n_rows), &x, |b, x| {
            b.iter(|| model.predict(black_box(x)).unwrap())
        });

        let predictions = model.predict(&x).unwrap();
        group.bench_with_input(BenchmarkId::new("metrics", n_rows), &predictions, |b, p| {
            b.iter(|| regression_metrics(black_box(&y), black_box(p)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_training, bench_prediction);
criterion_main!(benches);
