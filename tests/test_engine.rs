//! Integration tests: create/predict lifecycle end-to-end

use anomaly_engine::storage::{load_model, ModelArgs, MODEL_ARGS_KEY};
use anomaly_engine::{
    CreateOptions, DetectorEngine, EngineError, FsMetadataStore, MetadataStore, PredictOptions,
    SUPERVISED_ROW_THRESHOLD,
};
use polars::prelude::*;

fn engine(
    dir: &std::path::Path,
    instance: &str,
) -> DetectorEngine<FsMetadataStore> {
    let store = FsMetadataStore::new(dir.join("meta").join(instance)).unwrap();
    DetectorEngine::new(store, dir.join("artifacts"), instance)
}

fn stored_family(dir: &std::path::Path, instance: &str) -> String {
    let store = FsMetadataStore::new(dir.join("meta").join(instance)).unwrap();
    let value = store.json_get(MODEL_ARGS_KEY).unwrap().unwrap();
    let args: ModelArgs = serde_json::from_value(value).unwrap();
    load_model(args.model_path.as_ref()).unwrap().family().to_string()
}

/// Mixed-type frame with no label column
fn unlabeled_frame(rows: usize) -> DataFrame {
    df!(
        "amount" => (0..rows).map(|i| (i % 7) as f64 * 1.5).collect::<Vec<_>>(),
        "count" => (0..rows).map(|i| (i % 3) as i64).collect::<Vec<_>>(),
        "channel" => (0..rows).map(|i| if i % 2 == 0 { "web" } else { "store" }).collect::<Vec<_>>(),
    )
    .unwrap()
}

/// Frame with a fully labeled binary target
fn labeled_frame(rows: usize) -> DataFrame {
    df!(
        "amount" => (0..rows).map(|i| if i % 10 == 0 { 40.0 } else { (i % 5) as f64 }).collect::<Vec<_>>(),
        "count" => (0..rows).map(|i| (i % 4) as f64).collect::<Vec<_>>(),
        "label" => (0..rows).map(|i| if i % 10 == 0 { 1i64 } else { 0 }).collect::<Vec<_>>(),
    )
    .unwrap()
}

#[test]
fn test_unsupervised_round_trip_names_outlier_column() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path(), "unsup");
    let df = unlabeled_frame(50);

    engine.create(None, &df, &CreateOptions::default()).unwrap();
    let result = engine.predict(&df, &PredictOptions::default()).unwrap();

    assert_eq!(result.width(), 1);
    assert_eq!(result.get_column_names()[0].as_str(), "outlier");
    assert_eq!(result.height(), 50);
}

#[test]
fn test_heuristic_at_threshold_picks_hybrid() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path(), "at-threshold");
    let df = labeled_frame(SUPERVISED_ROW_THRESHOLD);

    engine
        .create(Some("label"), &df, &CreateOptions::default())
        .unwrap();
    assert_eq!(stored_family(dir.path(), "at-threshold"), "hybrid");
}

#[test]
fn test_heuristic_above_threshold_picks_boosted() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path(), "above-threshold");
    let df = labeled_frame(SUPERVISED_ROW_THRESHOLD + 1);

    engine
        .create(Some("label"), &df, &CreateOptions::default())
        .unwrap();
    assert_eq!(stored_family(dir.path(), "above-threshold"), "boosted");
}

#[test]
fn test_small_labeled_frame_picks_hybrid() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path(), "small");
    let df = labeled_frame(200);

    engine
        .create(Some("label"), &df, &CreateOptions::default())
        .unwrap();
    assert_eq!(stored_family(dir.path(), "small"), "hybrid");
}

#[test]
fn test_invalid_type_fails_and_persists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path(), "invalid");
    let df = unlabeled_frame(20);

    let err = engine
        .create(None, &df, &CreateOptions::with_model_type("invalid-value"))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidConfiguration(_)));

    let store = FsMetadataStore::new(dir.path().join("meta").join("invalid")).unwrap();
    assert!(store.json_get(MODEL_ARGS_KEY).unwrap().is_none());
    // nothing reached the artifact directory either
    assert!(!dir.path().join("artifacts").exists());
}

#[test]
fn test_explicit_modes_are_honored() {
    let dir = tempfile::tempdir().unwrap();
    let df = labeled_frame(120);

    for (instance, mode, family) in [
        ("exp-sup", "supervised", "boosted"),
        ("exp-semi", "semi-supervised", "hybrid"),
        ("exp-unsup", "unsupervised", "ecod"),
    ] {
        let engine = engine(dir.path(), instance);
        engine
            .create(Some("label"), &df, &CreateOptions::with_model_type(mode))
            .unwrap();
        assert_eq!(stored_family(dir.path(), instance), family, "mode {}", mode);
    }
}

#[test]
fn test_predict_drops_row_id_and_target() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path(), "drop-cols");
    let train = unlabeled_frame(40);

    engine
        .create(None, &train, &CreateOptions::default())
        .unwrap();

    let bare = engine.predict(&train, &PredictOptions::default()).unwrap();

    // same rows plus the host's row-id column and a stale target column
    let decorated = train
        .clone()
        .hstack(&[
            Series::new("__row_id".into(), (0..40i64).collect::<Vec<_>>()).into_column(),
            Series::new("outlier".into(), vec![0i64; 40]).into_column(),
        ])
        .unwrap();
    let result = engine
        .predict(&decorated, &PredictOptions::default())
        .unwrap();

    assert_eq!(result.height(), 40);
    // identical predictions in identical order
    let a = bare.column("outlier").unwrap().i64().unwrap();
    let b = result.column("outlier").unwrap().i64().unwrap();
    for (x, y) in a.into_iter().zip(b.into_iter()) {
        assert_eq!(x, y);
    }
}

#[test]
fn test_semisupervised_with_sentinel_labels() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path(), "sentinel");

    // half the rows unlabeled (-1), outliers labeled 1
    let df = df!(
        "amount" => (0..80).map(|i| if i % 20 == 0 { 50.0 } else { (i % 5) as f64 }).collect::<Vec<_>>(),
        "label" => (0..80).map(|i| {
            if i % 20 == 0 { 1i64 } else if i % 2 == 0 { 0 } else { -1 }
        }).collect::<Vec<_>>(),
    )
    .unwrap();

    engine
        .create(
            Some("label"),
            &df,
            &CreateOptions::with_model_type("semi-supervised"),
        )
        .unwrap();

    let result = engine
        .predict(&df.drop("label").unwrap(), &PredictOptions::default())
        .unwrap();
    assert_eq!(result.height(), 80);
    assert_eq!(result.get_column_names()[0].as_str(), "label");
}

#[test]
fn test_options_parsed_from_host_json() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path(), "json-opts");
    let df = unlabeled_frame(30);

    let options: CreateOptions =
        serde_json::from_str(r#"{"using": {"type": "unsupervised"}}"#).unwrap();
    engine.create(None, &df, &options).unwrap();
    assert_eq!(stored_family(dir.path(), "json-opts"), "ecod");
}
