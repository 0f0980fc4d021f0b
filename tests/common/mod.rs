#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use team_classifier::ArtifactPaths;

pub mod onnx;

pub const TEAMS: [&str; 4] = ["Desktop Support", "HR Systems", "Networking", "Security"];

// Term index -> team index
const VOCABULARY: [(&str, usize, usize); 8] = [
    ("network", 0, 2),
    ("vpn", 1, 2),
    ("payroll", 2, 1),
    ("salary", 3, 1),
    ("printer", 4, 0),
    ("laptop", 5, 0),
    ("phishing", 6, 3),
    ("password", 7, 3),
];

pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

pub fn vectorizer_json() -> serde_json::Value {
    let vocabulary: serde_json::Map<String, serde_json::Value> = VOCABULARY
        .iter()
        .map(|(term, index, _)| (term.to_string(), json!(index)))
        .collect();
    json!({
        "vocabulary": vocabulary,
        "idf": [1.2, 1.5, 1.1, 1.4, 1.3, 1.2, 1.8, 1.6],
        "lowercase": true,
        "sublinear_tf": true,
        "norm": "l2"
    })
}

pub fn label_encoder_json() -> serde_json::Value {
    json!({ "classes": TEAMS })
}

/// One row of weights per team: each known term votes for its team.
pub fn coefficients() -> Vec<Vec<f32>> {
    let mut coefficients = vec![vec![0.0f32; VOCABULARY.len()]; TEAMS.len()];
    for (_, term, team) in VOCABULARY {
        coefficients[team][term] = 6.0;
    }
    coefficients
}

pub fn linear_classifier_json() -> serde_json::Value {
    json!({
        "coefficients": coefficients(),
        "intercept": [0.0, 0.0, 0.0, 0.0]
    })
}

/// Writes the same model as [`linear_classifier_json`] in ONNX form.
pub fn write_onnx_classifier(dir: &Path, name: &str, scores_name: &str, label_first: bool) -> PathBuf {
    let path = dir.join(name);
    let model = onnx::linear_classifier(&coefficients(), &[0.0; 4], scores_name, label_first);
    fs::write(&path, model).unwrap();
    path
}

pub fn write_json(dir: &Path, name: &str, value: &serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path
}

/// Writes a consistent vectorizer / label encoder / linear classifier set into `dir`.
pub fn write_artifacts(dir: &Path) -> ArtifactPaths {
    ArtifactPaths::new(
        write_json(dir, "vectorizer.json", &vectorizer_json()),
        write_json(dir, "label_encoder.json", &label_encoder_json()),
        write_json(dir, "classifier.json", &linear_classifier_json()),
    )
}
