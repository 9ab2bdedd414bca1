//! Integration test: Full pipeline (bootstrap → train from CSV → load → predict)

use nids_pipeline::config::PipelineConfig;
use nids_pipeline::error::NidsError;
use nids_pipeline::inference::InferenceConfig;
use nids_pipeline::preprocessing::ColumnKind;
use nids_pipeline::training::{ModelType, TrainingConfig};
use nids_pipeline::{
    ensure_directories, load_model, predict_from_csv, predict_from_csv_with,
    train_model_from_csv, train_model_from_csv_with,
};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PROTOCOLS: [&str; 3] = ["tcp", "udp", "icmp"];

/// One flow row; every third row is an attack with short, heavy traffic
fn flow_row(i: usize) -> (f64, &'static str, u64, &'static str) {
    let attack = i % 3 == 0;
    let duration = if attack {
        0.1 + (i % 5) as f64 * 0.01
    } else {
        2.0 + (i % 7) as f64 * 0.5
    };
    let bytes = if attack { 50_000 + i as u64 * 10 } else { 500 + i as u64 };
    let label = if attack { "attack" } else { "normal" };
    (duration, PROTOCOLS[(i / 2) % 3], bytes, label)
}

fn write_training_csv(path: &Path, n: usize) {
    let mut out = String::from("duration,protocol,bytes,label\n");
    for i in 0..n {
        let (duration, protocol, bytes, label) = flow_row(i);
        writeln!(out, "{},{},{},{}", duration, protocol, bytes, label).unwrap();
    }
    fs::write(path, out).unwrap();
}

fn write_batch_csv(path: &Path, n: usize) {
    let mut out = String::from("duration,protocol,bytes\n");
    for i in 0..n {
        let (duration, protocol, bytes, _) = flow_row(i + 1000);
        writeln!(out, "{},{},{}", duration, protocol, bytes).unwrap();
    }
    fs::write(path, out).unwrap();
}

struct Workspace {
    _dir: TempDir,
    config: PipelineConfig,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::default()
            .with_base_dir(dir.path())
            .with_training(TrainingConfig::default().with_n_estimators(20));
        ensure_directories(config.directories()).unwrap();
        Self { _dir: dir, config }
    }

    fn data(&self, name: &str) -> PathBuf {
        self.config.data_dir.join(name)
    }

    fn upload(&self, name: &str) -> PathBuf {
        self.config.upload_dir.join(name)
    }
}

#[test]
fn test_train_then_load_matches_schema() {
    let ws = Workspace::new();
    let csv = ws.data("flows.csv");
    write_training_csv(&csv, 100);

    let metrics = train_model_from_csv(&csv, "label", &ws.config.models_dir).unwrap();

    for score in [metrics.accuracy, metrics.precision, metrics.recall, metrics.f1_score] {
        assert!((0.0..=1.0).contains(&score), "score out of range: {}", score);
    }
    assert!(metrics.accuracy >= 0.9, "accuracy {}", metrics.accuracy);
    assert_eq!(metrics.n_train + metrics.n_holdout, 100);
    assert_eq!(metrics.positive_class.as_deref(), Some("attack"));
    assert!(ws.config.models_dir.join("model.json").is_file());

    let artifact = load_model(&ws.config.models_dir).unwrap().expect("artifact stored");
    assert_eq!(artifact.feature_names(), vec!["duration", "protocol", "bytes"]);
    assert_eq!(artifact.labels.classes(), &["attack", "normal"]);
    assert_eq!(artifact.benign_classes, vec!["normal".to_string()]);
    assert_eq!(artifact.model_type(), ModelType::RandomForest);
    assert!(matches!(
        artifact.schema.column("protocol").unwrap().kind,
        ColumnKind::Categorical { .. }
    ));
    assert!(matches!(
        artifact.schema.column("bytes").unwrap().kind,
        ColumnKind::Numeric { .. }
    ));
}

#[test]
fn test_predict_ten_rows_in_order() {
    let ws = Workspace::new();
    write_training_csv(&ws.data("flows.csv"), 100);
    train_model_from_csv_with(ws.data("flows.csv"), &ws.config).unwrap();

    let batch = ws.upload("batch.csv");
    write_batch_csv(&batch, 10);

    let artifact = load_model(&ws.config.models_dir).unwrap();
    let (results, summary) = predict_from_csv(artifact.as_ref(), &batch).unwrap();

    assert_eq!(results.len(), 10);
    assert_eq!(summary.num_rows, 10);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.row, i);
        assert!(result.confidence > 0.0 && result.confidence <= 1.0);
        let expected = flow_row(i + 1000).3;
        assert_eq!(result.label, expected, "row {}", i);
    }
    assert_eq!(summary.class_counts.values().sum::<usize>(), 10);

    let attacks = results.iter().filter(|r| r.label == "attack").count();
    assert_eq!(summary.anomaly_count, Some(attacks));
    assert_eq!(summary.anomaly_rate, Some(attacks as f64 / 10.0));
}

#[test]
fn test_predict_without_model_fails() {
    let ws = Workspace::new();
    let batch = ws.upload("batch.csv");
    write_batch_csv(&batch, 3);

    assert!(load_model(&ws.config.models_dir).unwrap().is_none());
    let err = predict_from_csv(None, &batch).unwrap_err();
    assert!(matches!(err, NidsError::ModelNotTrained));
}

#[test]
fn test_identical_input_identical_model() {
    let a = Workspace::new();
    let b = Workspace::new();
    write_training_csv(&a.data("flows.csv"), 90);
    write_training_csv(&b.data("flows.csv"), 90);

    let ma = train_model_from_csv_with(a.data("flows.csv"), &a.config).unwrap();
    let mb = train_model_from_csv_with(b.data("flows.csv"), &b.config).unwrap();

    assert_eq!(ma.accuracy, mb.accuracy);
    assert_eq!(ma.f1_score, mb.f1_score);
    assert_eq!(ma.n_holdout, mb.n_holdout);

    let artifact_a = load_model(&a.config.models_dir).unwrap().unwrap();
    let artifact_b = load_model(&b.config.models_dir).unwrap().unwrap();
    assert_eq!(artifact_a.schema, artifact_b.schema);
    assert_eq!(artifact_a.labels, artifact_b.labels);

    let batch = a.upload("batch.csv");
    write_batch_csv(&batch, 20);
    let (ra, _) = predict_from_csv(Some(&artifact_a), &batch).unwrap();
    let (rb, _) = predict_from_csv(Some(&artifact_b), &batch).unwrap();
    assert_eq!(ra, rb);
}

#[test]
fn test_single_label_fails_and_writes_nothing() {
    let ws = Workspace::new();
    let csv = ws.data("benign.csv");
    fs::write(&csv, "duration,bytes,label\n1,10,normal\n2,20,normal\n3,30,normal\n").unwrap();

    let err = train_model_from_csv(&csv, "label", &ws.config.models_dir).unwrap_err();
    assert!(matches!(err, NidsError::TrainingError(_)));
    assert!(load_model(&ws.config.models_dir).unwrap().is_none());
}

#[test]
fn test_failed_retrain_keeps_previous_artifact() {
    let ws = Workspace::new();
    write_training_csv(&ws.data("flows.csv"), 60);
    train_model_from_csv_with(ws.data("flows.csv"), &ws.config).unwrap();
    let before = load_model(&ws.config.models_dir).unwrap().unwrap();

    let bad = ws.data("bad.csv");
    fs::write(&bad, "duration,bytes,label\n1,10,normal\n2,20,normal\n").unwrap();
    assert!(train_model_from_csv_with(&bad, &ws.config).is_err());

    let after = load_model(&ws.config.models_dir).unwrap().unwrap();
    assert_eq!(after.trained_at, before.trained_at);
    assert_eq!(after.schema, before.schema);
}

#[test]
fn test_retrain_overwrites_artifact() {
    let ws = Workspace::new();
    write_training_csv(&ws.data("flows.csv"), 60);
    train_model_from_csv_with(ws.data("flows.csv"), &ws.config).unwrap();

    let csv = ws.data("other.csv");
    fs::write(
        &csv,
        "packets,label\n1,a\n2,a\n3,a\n40,b\n50,b\n60,b\n",
    )
    .unwrap();
    train_model_from_csv(&csv, "label", &ws.config.models_dir).unwrap();

    let artifact = load_model(&ws.config.models_dir).unwrap().unwrap();
    assert_eq!(artifact.feature_names(), vec!["packets"]);
    assert!(artifact.benign_classes.is_empty());
}

#[test]
fn test_missing_column_rejects_batch() {
    let ws = Workspace::new();
    write_training_csv(&ws.data("flows.csv"), 60);
    train_model_from_csv_with(ws.data("flows.csv"), &ws.config).unwrap();
    let artifact = load_model(&ws.config.models_dir).unwrap();

    let batch = ws.upload("partial.csv");
    fs::write(&batch, "duration,protocol\n1.0,tcp\n").unwrap();

    let err = predict_from_csv(artifact.as_ref(), &batch).unwrap_err();
    match err {
        NidsError::SchemaMismatch(msg) => assert!(msg.contains("bytes"), "{}", msg),
        other => panic!("expected SchemaMismatch, got {:?}", other),
    }
}

#[test]
fn test_extra_column_and_unknown_category() {
    let ws = Workspace::new();
    write_training_csv(&ws.data("flows.csv"), 60);
    train_model_from_csv_with(ws.data("flows.csv"), &ws.config).unwrap();
    let artifact = load_model(&ws.config.models_dir).unwrap();

    let batch = ws.upload("odd.csv");
    fs::write(
        &batch,
        "src_ip,bytes,protocol,duration\n10.0.0.1,700,sctp,3.0\n10.0.0.2,,tcp,\n",
    )
    .unwrap();

    let (results, summary) = predict_from_csv(artifact.as_ref(), &batch).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(summary.unknown_categories, 1);
    assert_eq!(summary.imputed_cells, 2);
}

#[test]
fn test_label_column_named_in_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::default()
        .with_base_dir(dir.path())
        .with_training(
            TrainingConfig::new("class")
                .with_model(ModelType::DecisionTree)
                .with_benign_labels(["BENIGN"]),
        );
    ensure_directories(config.directories()).unwrap();

    let csv = config.data_dir.join("cic.csv");
    let mut out = String::from("flow_bytes,class\n");
    for i in 0..40 {
        let benign = i % 2 == 0;
        writeln!(out, "{},{}", if benign { 100 + i } else { 9000 + i }, if benign { "BENIGN" } else { "DDoS" }).unwrap();
    }
    fs::write(&csv, out).unwrap();

    let metrics = train_model_from_csv_with(&csv, &config).unwrap();
    assert_eq!(metrics.positive_class.as_deref(), Some("DDoS"));
    assert_eq!(metrics.accuracy, 1.0);
}

fn assert_ragged(err: NidsError, line: usize) {
    match err {
        NidsError::SchemaMismatch(msg) => {
            assert!(msg.contains(&format!("line {}", line)), "{}", msg)
        }
        other => panic!("expected SchemaMismatch, got {:?}", other),
    }
}

#[test]
fn test_short_training_row_is_rejected() {
    let ws = Workspace::new();
    let csv = ws.data("short.csv");
    write_training_csv(&csv, 20);
    let mut text = fs::read_to_string(&csv).unwrap();
    text.push_str("5,tcp\n");
    fs::write(&csv, text).unwrap();

    let err = train_model_from_csv_with(&csv, &ws.config).unwrap_err();
    assert_ragged(err, 22);
    assert!(load_model(&ws.config.models_dir).unwrap().is_none());
}

#[test]
fn test_long_training_row_is_rejected() {
    let ws = Workspace::new();
    let csv = ws.data("long.csv");
    write_training_csv(&csv, 20);
    let mut text = fs::read_to_string(&csv).unwrap();
    text.push_str("5,tcp,100,attack,extra\n");
    fs::write(&csv, text).unwrap();

    let err = train_model_from_csv(&csv, "label", &ws.config.models_dir).unwrap_err();
    assert_ragged(err, 22);
    assert!(load_model(&ws.config.models_dir).unwrap().is_none());
}

#[test]
fn test_ragged_batch_rows_are_rejected() {
    let ws = Workspace::new();
    write_training_csv(&ws.data("flows.csv"), 60);
    train_model_from_csv_with(ws.data("flows.csv"), &ws.config).unwrap();
    let artifact = load_model(&ws.config.models_dir).unwrap();

    let short = ws.upload("short.csv");
    fs::write(&short, "duration,protocol,bytes\n1,tcp,9000\n2\n3,udp,100\n").unwrap();
    assert_ragged(predict_from_csv(artifact.as_ref(), &short).unwrap_err(), 3);

    let long = ws.upload("long.csv");
    fs::write(&long, "duration,protocol,bytes\n1,tcp,9000\n2,udp,100,extra\n").unwrap();
    assert_ragged(predict_from_csv(artifact.as_ref(), &long).unwrap_err(), 3);
}

#[test]
fn test_huge_values_train_a_loadable_model() {
    let ws = Workspace::new();
    let csv = ws.data("huge.csv");
    let mut out = String::from("bytes,label\n");
    for i in 0..20 {
        if i % 2 == 0 {
            out.push_str("1e308,attack\n");
        } else {
            out.push_str("1,normal\n");
        }
    }
    fs::write(&csv, out).unwrap();

    train_model_from_csv_with(&csv, &ws.config).unwrap();
    let artifact = load_model(&ws.config.models_dir)
        .unwrap()
        .expect("artifact readable");
    match artifact.schema.column("bytes").unwrap().kind {
        ColumnKind::Numeric { fill_value } => assert!(fill_value.is_finite(), "{}", fill_value),
        ref other => panic!("expected numeric column, got {:?}", other),
    }

    let batch = ws.upload("huge_batch.csv");
    fs::write(&batch, "bytes\n1e308\n1\n").unwrap();
    let (results, _) = predict_from_csv(Some(&artifact), &batch).unwrap();
    assert_eq!(results[0].label, "attack");
    assert_eq!(results[1].label, "normal");
}

#[test]
fn test_chunked_parallel_scoring_matches_serial() {
    let ws = Workspace::new();
    write_training_csv(&ws.data("flows.csv"), 100);
    train_model_from_csv_with(ws.data("flows.csv"), &ws.config).unwrap();
    let artifact = load_model(&ws.config.models_dir).unwrap();

    let batch = ws.upload("large.csv");
    write_batch_csv(&batch, 2500);

    let chunked = InferenceConfig::default().with_batch_size(100);
    let serial = InferenceConfig::default().with_parallel(false);
    let (parallel_rows, parallel_summary) =
        predict_from_csv_with(artifact.as_ref(), &batch, &chunked).unwrap();
    let (serial_rows, serial_summary) =
        predict_from_csv_with(artifact.as_ref(), &batch, &serial).unwrap();

    assert_eq!(parallel_rows.len(), 2500);
    for (i, result) in parallel_rows.iter().enumerate() {
        assert_eq!(result.row, i);
    }
    assert_eq!(parallel_rows, serial_rows);
    assert_eq!(parallel_summary, serial_summary);
}

#[test]
fn test_semicolon_separated_training() {
    let ws = Workspace::new();
    let config = ws.config.clone().with_delimiter(b';');
    let csv = ws.data("flows_semicolon.csv");
    let mut out = String::from("duration;protocol;bytes;label\n");
    for i in 0..60 {
        let (duration, protocol, bytes, label) = flow_row(i);
        writeln!(out, "{};{};{};{}", duration, protocol, bytes, label).unwrap();
    }
    fs::write(&csv, out).unwrap();

    train_model_from_csv_with(&csv, &config).unwrap();
    let artifact = load_model(&config.models_dir).unwrap().unwrap();
    assert_eq!(artifact.feature_names(), vec!["duration", "protocol", "bytes"]);
}
