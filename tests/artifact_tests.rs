/// Artifact loading, degraded start-up and configuration
///
/// Run with: cargo test --test artifact_tests -- --nocapture

mod common;

use common::reference_batch;
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use traffic_signal::model::load_model;
use traffic_signal::schema::{feature_index, FEATURE_COUNT, FEATURE_NAMES, SCALED_FEATURES};
use traffic_signal::{
    Availability, Config, DecisionPolicy, DenseModel, NormalizationTransform, PredictError,
    PredictionResult, TrafficPredictor,
};

/// Single linear layer that passes one column straight through.
fn passthrough_model(column: &str) -> serde_json::Value {
    let idx = feature_index(column).expect("column in schema");
    let weights: Vec<Vec<f64>> = (0..FEATURE_COUNT)
        .map(|i| vec![if i == idx { 1.0 } else { 0.0 }])
        .collect();
    json!({
        "feature_names": FEATURE_NAMES,
        "layers": [{ "weights": weights, "bias": [0.0], "activation": "linear" }]
    })
}

fn identity_transform() -> serde_json::Value {
    json!({
        "feature_names": SCALED_FEATURES,
        "mean": vec![0.0; SCALED_FEATURES.len()],
        "scale": vec![1.0; SCALED_FEATURES.len()],
    })
}

fn write_json(path: &Path, v: &serde_json::Value) {
    fs::write(path, serde_json::to_string_pretty(v).unwrap()).unwrap();
}

#[test]
fn test_load_and_predict_from_disk() {
    println!("\n=== Test: Load Artifacts From Disk ===");
    let dir = tempdir().unwrap();
    let model_path = dir.path().join("trained_model.json");
    let transform_path = dir.path().join("scaler.json");
    write_json(&model_path, &passthrough_model("Congestion_Index"));
    write_json(&transform_path, &identity_transform());

    let cfg = Config {
        model_path,
        transform_path,
        ..Config::default()
    };
    let predictor = TrafficPredictor::load(&cfg);
    assert_eq!(predictor.availability(), Availability::Ready);

    // congestion index x2 per lane: 104, 43.2, 78, 74.8 -> clipped 99, 43, 78, 75
    let result = predictor.predict_batch(&reference_batch()).unwrap();
    assert_eq!(
        result,
        PredictionResult {
            east_west_seconds: 99,
            south_north_seconds: 78,
        }
    );
    println!("✓ {:?}", result);
}

#[test]
fn test_missing_artifacts_degrade_instead_of_crashing() {
    println!("\n=== Test: Degraded Start-up ===");
    let dir = tempdir().unwrap();
    let transform_path = dir.path().join("scaler.json");
    write_json(&transform_path, &identity_transform());

    let cfg = Config {
        model_path: dir.path().join("missing_model.json"),
        transform_path,
        ..Config::default()
    };
    let predictor = TrafficPredictor::load(&cfg);

    match predictor.availability() {
        Availability::Unavailable { reason } => {
            assert!(reason.contains("missing_model.json"), "{}", reason);
        }
        Availability::Ready => panic!("predictor should be unavailable"),
    }

    let err = predictor.predict_batch(&reference_batch()).unwrap_err();
    assert!(matches!(err, PredictError::ModelUnavailable { .. }));
    assert_eq!(err.kind(), "model_unavailable");
    println!("✓ {}", err);
}

#[test]
fn test_mismatched_transform_is_not_loaded() {
    println!("\n=== Test: Transform Column Contract ===");
    let dir = tempdir().unwrap();
    let model_path = dir.path().join("trained_model.json");
    let transform_path = dir.path().join("scaler.json");
    write_json(&model_path, &passthrough_model("Speed"));

    // fitted for the variant without composite features
    let short: Vec<&str> = SCALED_FEATURES[..17].to_vec();
    write_json(
        &transform_path,
        &json!({ "feature_names": short, "mean": vec![0.0; 17], "scale": vec![1.0; 17] }),
    );

    let predictor = TrafficPredictor::load(&Config {
        model_path,
        transform_path,
        ..Config::default()
    });
    assert!(!predictor.availability().is_ready());
    println!("✓ Transform for another schema variant rejected");
}

#[test]
fn test_dense_model_shape_checks() {
    println!("\n=== Test: Dense Model Validation ===");

    // wrong input width
    let bad_width = json!({ "layers": [{ "weights": vec![vec![1.0]; 30], "bias": [0.0] }] });
    assert!(DenseModel::from_json_str(&bad_width.to_string()).is_err());

    // two outputs
    let two_out = json!({ "layers": [{ "weights": vec![vec![1.0, 1.0]; FEATURE_COUNT], "bias": [0.0, 0.0] }] });
    assert!(DenseModel::from_json_str(&two_out.to_string()).is_err());

    // feature names in a different order
    let mut names: Vec<&str> = FEATURE_NAMES.to_vec();
    names.swap(12, 13);
    let reordered = json!({
        "feature_names": names,
        "layers": [{ "weights": vec![vec![1.0]; FEATURE_COUNT], "bias": [0.0] }]
    });
    assert!(DenseModel::from_json_str(&reordered.to_string()).is_err());

    // hidden relu layer chains into a scalar output
    let hidden = json!({
        "layers": [
            { "weights": vec![vec![1.0, -1.0]; FEATURE_COUNT], "bias": [0.5, 0.5], "activation": "relu" },
            { "weights": [[2.0], [3.0]], "bias": [1.0] }
        ]
    });
    let model = DenseModel::from_json_str(&hidden.to_string()).unwrap();
    let x = ndarray::Array2::<f64>::ones((2, FEATURE_COUNT));
    let out = traffic_signal::RegressionModel::predict(&model, x.view()).unwrap();
    // relu(31 + 0.5) * 2 + relu(-31 + 0.5) * 3 + 1
    assert_eq!(out, vec![64.0, 64.0]);
    println!("✓ Shapes validated, forward pass correct");
}

#[test]
fn test_torchscript_needs_feature() {
    println!("\n=== Test: TorchScript Without Feature ===");
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.pt");
    fs::write(&path, b"not a real module").unwrap();
    assert!(load_model(&path).is_err());
    println!("✓ .pt artifact refused");
}

#[test]
fn test_transform_scales_in_fitted_order() {
    println!("\n=== Test: Fitted Column Order ===");
    // mean of column i is i, so every column shifts by a different amount
    let means: Vec<f64> = (0..SCALED_FEATURES.len()).map(|i| i as f64).collect();
    let transform =
        NormalizationTransform::new(&means, &vec![1.0; SCALED_FEATURES.len()]).unwrap();

    let reading = traffic_signal::LaneReading::default();
    let row = traffic_signal::FeatureEngineer::new(&transform).engineer(&reading);

    let day = feature_index("DayOfWeek").unwrap();
    let hour = feature_index("Hour").unwrap();
    approx::assert_abs_diff_eq!(row[day], (0.0 - 10.0) * 0.9, epsilon = 1e-12);
    approx::assert_abs_diff_eq!(row[hour], (0.0 - 11.0) * 0.8, epsilon = 1e-12);
    println!("✓ DayOfWeek={:.2} Hour={:.2}", row[day], row[hour]);
}

#[test]
fn test_config_file_and_overrides() {
    println!("\n=== Test: Config Layers ===");
    let dir = tempdir().unwrap();
    let cfg_path = dir.path().join("traffic.json");
    write_json(
        &cfg_path,
        &json!({
            "model_path": "/srv/models/m.json",
            "policy": { "floor": 40, "ceiling": 120 }
        }),
    );

    let mut cfg = Config::from_file(&cfg_path).unwrap();
    assert_eq!(cfg.policy, DecisionPolicy::legacy());
    assert_eq!(cfg.transform_path, Config::default().transform_path);

    let env: HashMap<&str, &str> = [
        ("TRANSFORM_PATH", "/srv/models/s.json"),
        ("STRICT_VALIDATION", "true"),
        ("LOG_FEATURES", "0"),
    ]
    .into_iter()
    .collect();
    cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string())).unwrap();
    assert_eq!(cfg.model_path, Path::new("/srv/models/m.json"));
    assert_eq!(cfg.transform_path, Path::new("/srv/models/s.json"));
    assert!(cfg.strict_validation);
    assert!(!cfg.log_features);

    let bad = cfg.apply_overrides(|k| (k == "STRICT_VALIDATION").then(|| "maybe".to_string()));
    assert!(bad.is_err());

    let invalid = Config {
        policy: DecisionPolicy {
            clip_min: 90.0,
            clip_max: 10.0,
            ..DecisionPolicy::default()
        },
        ..Config::default()
    };
    assert!(invalid.validate().is_err());
    println!("✓ File, env and validation layers behave");
}
