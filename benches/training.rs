use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nids_pipeline::inference::{InferenceConfig, InferenceEngine};
use nids_pipeline::training::{ModelType, TrainEngine, TrainingConfig};
use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const PROTOCOLS: [&str; 3] = ["tcp", "udp", "icmp"];

/// Flow records as raw strings, the way they come out of a CSV
fn create_flow_data(n_rows: usize, n_numeric: usize, labeled: bool) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(n_rows as u64);
    let attack: Vec<bool> = (0..n_rows).map(|_| rng.gen_bool(0.3)).collect();

    let mut columns: Vec<Column> = (0..n_numeric)
        .map(|i| {
            let values: Vec<String> = attack
                .iter()
                .map(|&is_attack| {
                    let base = if is_attack { 5.0 } else { 0.0 };
                    format!("{:.3}", base + rng.gen::<f64>() * 10.0)
                })
                .collect();
            Series::new(format!("feature_{}", i).into(), values).into()
        })
        .collect();

    let protocol: Vec<&str> = (0..n_rows).map(|_| PROTOCOLS[rng.gen_range(0..3)]).collect();
    columns.push(Series::new("protocol".into(), protocol).into());

    if labeled {
        let label: Vec<&str> = attack
            .iter()
            .map(|&is_attack| if is_attack { "attack" } else { "normal" })
            .collect();
        columns.push(Series::new("label".into(), label).into());
    }

    DataFrame::new(columns).unwrap()
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    for model_type in [ModelType::DecisionTree, ModelType::RandomForest, ModelType::NaiveBayes] {
        for n_rows in [1000, 5000].iter() {
            let df = create_flow_data(*n_rows, 10, true);

            group.bench_with_input(
                BenchmarkId::new(model_type.to_string(), n_rows),
                &df,
                |b, df| {
                    b.iter(|| {
                        let config = TrainingConfig::default()
                            .with_model(model_type)
                            .with_n_estimators(20);
                        let mut engine = TrainEngine::new(config);
                        engine.fit(black_box(df)).unwrap().accuracy
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train model once
    let train_df = create_flow_data(5000, 10, true);
    let config = TrainingConfig::default().with_n_estimators(20);
    let mut engine = TrainEngine::new(config);
    engine.fit(&train_df).unwrap();
    let artifact = engine.into_artifact().unwrap();
    let inference = InferenceEngine::new(Some(&artifact), InferenceConfig::default()).unwrap();

    for n_rows in [100, 1000, 10000].iter() {
        let test_df = create_flow_data(*n_rows, 10, false);

        group.bench_with_input(
            BenchmarkId::new("predict", n_rows),
            &test_df,
            |b, df| {
                b.iter(|| inference.predict(black_box(df)).unwrap())
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_training, bench_prediction);
criterion_main!(benches);
