//! Integration test: artifact persistence and crash safety

use nids_pipeline::error::NidsError;
use nids_pipeline::export::{ArtifactStore, ArtifactVersion, ModelArtifact, ARTIFACT_FORMAT};
use nids_pipeline::training::{ModelType, TrainEngine, TrainingConfig};
use polars::prelude::*;
use std::fs;

fn flows(n: usize, scale: u64) -> DataFrame {
    let bytes: Vec<String> = (0..n)
        .map(|i| if i % 2 == 0 { (100 + i as u64).to_string() } else { (scale + i as u64).to_string() })
        .collect();
    let service: Vec<String> = (0..n)
        .map(|i| ["http", "dns", "ssh"][i % 3].to_string())
        .collect();
    let label: Vec<String> = (0..n)
        .map(|i| if i % 2 == 0 { "normal".to_string() } else { "portscan".to_string() })
        .collect();
    df!("bytes" => bytes, "service" => service, "label" => label).unwrap()
}

fn trained_artifact(model_type: ModelType, scale: u64) -> ModelArtifact {
    let config = TrainingConfig::default()
        .with_model(model_type)
        .with_n_estimators(5);
    let mut engine = TrainEngine::new(config);
    engine.fit(&flows(40, scale)).unwrap();
    engine.into_artifact().unwrap()
}

#[test]
fn test_save_then_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());

    for model_type in [ModelType::DecisionTree, ModelType::RandomForest, ModelType::NaiveBayes] {
        let artifact = trained_artifact(model_type, 9000);
        let path = store.save(&artifact).unwrap();
        assert_eq!(path, dir.path().join("model.json"));

        let loaded = store.load().unwrap().expect("artifact present");
        assert_eq!(loaded.format, ARTIFACT_FORMAT);
        assert_eq!(loaded.version, ArtifactVersion::CURRENT);
        assert_eq!(loaded.model_type(), model_type);
        assert_eq!(loaded.schema, artifact.schema);
        assert_eq!(loaded.labels, artifact.labels);
        assert_eq!(loaded.labels.encode("portscan"), Some(1));
        assert_eq!(loaded.benign_classes, vec!["normal".to_string()]);
        assert_eq!(loaded.trained_at, artifact.trained_at);
        assert_eq!(loaded.metrics, artifact.metrics);
    }
}

#[test]
fn test_load_from_empty_or_missing_dir() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ArtifactStore::new(dir.path()).load().unwrap().is_none());
    assert!(ArtifactStore::new(dir.path().join("never-created")).load().unwrap().is_none());
}

#[test]
fn test_save_creates_models_dir() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path().join("nested").join("models"));
    store.save(&trained_artifact(ModelType::DecisionTree, 9000)).unwrap();
    assert!(store.exists());
}

#[test]
fn test_failed_save_keeps_previous_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let first = trained_artifact(ModelType::DecisionTree, 9000);
    store.save(&first).unwrap();

    // A directory squatting on the temp path makes the write fail
    fs::create_dir(dir.path().join("model.json.tmp")).unwrap();
    let second = trained_artifact(ModelType::NaiveBayes, 50_000);
    assert!(store.save(&second).is_err());

    let loaded = store.load().unwrap().unwrap();
    assert_eq!(loaded.model_type(), ModelType::DecisionTree);
    assert_eq!(loaded.trained_at, first.trained_at);
}

#[test]
fn test_leftover_temp_file_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    store.save(&trained_artifact(ModelType::DecisionTree, 9000)).unwrap();

    fs::write(dir.path().join("model.json.tmp"), b"{\"format\": \"nids-pip").unwrap();
    let loaded = store.load().unwrap().unwrap();
    assert_eq!(loaded.model_type(), ModelType::DecisionTree);

    // The next save replaces the leftover
    store.save(&trained_artifact(ModelType::NaiveBayes, 9000)).unwrap();
    assert_eq!(store.load().unwrap().unwrap().model_type(), ModelType::NaiveBayes);
    assert!(!dir.path().join("model.json.tmp").exists());
}

#[test]
fn test_corrupt_artifact_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());

    let cases: [&[u8]; 4] = [
        b"",
        b"not json at all",
        br#"{"format":"nids-pipeline/model","version":{"major":1,"minor":0,"patch":0}}"#,
        br#"{"format":"pickle","version":{"major":1,"minor":0,"patch":0}}"#,
    ];
    for bytes in cases {
        fs::write(store.path(), bytes).unwrap();
        match store.load() {
            Err(NidsError::CorruptArtifact { path, .. }) => {
                assert!(path.ends_with("model.json"), "{}", path)
            }
            other => panic!("expected CorruptArtifact, got {:?}", other.map(|a| a.is_some())),
        }
    }
}

#[test]
fn test_truncated_artifact_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    store.save(&trained_artifact(ModelType::RandomForest, 9000)).unwrap();

    let bytes = fs::read(store.path()).unwrap();
    fs::write(store.path(), &bytes[..bytes.len() / 2]).unwrap();

    assert!(matches!(store.load(), Err(NidsError::CorruptArtifact { .. })));
}

#[test]
fn test_info_reports_stored_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    assert!(store.info().unwrap().is_none());

    store.save(&trained_artifact(ModelType::DecisionTree, 9000)).unwrap();
    let info = store.info().unwrap().unwrap();
    assert_eq!(info.path, store.path());
    assert_eq!(info.size_bytes, fs::metadata(store.path()).unwrap().len());
    assert!(info.size_bytes > 0);
}
