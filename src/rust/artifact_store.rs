use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::classifier::{
    ClassifierError, LabelEncoder, LabelEncoderSpec, LabelEncoding, LinearModel, LinearSpec,
    OnnxModel, ScoringModel, TextVectorizer, TfidfSpec, TfidfVectorizer,
};
use crate::runtime::{RuntimeConfig, RuntimeGate};

pub const DEFAULT_MODELS_DIR: &str = "MLModels";
pub const DEFAULT_VECTORIZER_FILE: &str = "vectorizer.json";
pub const DEFAULT_LABEL_ENCODER_FILE: &str = "label_encoder.json";
pub const DEFAULT_CLASSIFIER_FILE: &str = "xgb_classifier.onnx";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Vectorizer,
    LabelEncoder,
    Classifier,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vectorizer => write!(f, "vectorizer"),
            Self::LabelEncoder => write!(f, "label-encoder"),
            Self::Classifier => write!(f, "classifier"),
        }
    }
}

/// Serialized form of an artifact, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Json,
    Onnx,
    InMemory,
}

impl ArtifactFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "onnx" => Some(Self::Onnx),
            _ => None,
        }
    }
}

/// Location of one artifact, optionally pinned to a SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    pub path: PathBuf,
    pub sha256: Option<String>,
}

impl ArtifactSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), sha256: None }
    }

    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        self.sha256 = Some(digest.into());
        self
    }
}

/// Where the three artifacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub vectorizer: ArtifactSource,
    pub label_encoder: ArtifactSource,
    pub classifier: ArtifactSource,
}

impl ArtifactPaths {
    pub fn new(
        vectorizer: impl Into<PathBuf>,
        label_encoder: impl Into<PathBuf>,
        classifier: impl Into<PathBuf>,
    ) -> Self {
        Self {
            vectorizer: ArtifactSource::new(vectorizer),
            label_encoder: ArtifactSource::new(label_encoder),
            classifier: ArtifactSource::new(classifier),
        }
    }

    /// Resolves the default file names inside `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(
            dir.join(DEFAULT_VECTORIZER_FILE),
            dir.join(DEFAULT_LABEL_ENCODER_FILE),
            dir.join(DEFAULT_CLASSIFIER_FILE),
        )
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::from_dir(DEFAULT_MODELS_DIR)
    }
}

/// Provenance of a loaded artifact. The digest doubles as its version.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactMetadata {
    pub kind: ArtifactKind,
    pub source: PathBuf,
    pub format: ArtifactFormat,
    pub sha256: String,
    pub size_bytes: u64,
    pub loaded_at: SystemTime,
}

impl ArtifactMetadata {
    fn in_memory(kind: ArtifactKind) -> Self {
        Self {
            kind,
            source: PathBuf::from("<in-memory>"),
            format: ArtifactFormat::InMemory,
            sha256: String::new(),
            size_bytes: 0,
            loaded_at: SystemTime::now(),
        }
    }
}

/// A deserialized artifact, tagged by kind.
#[derive(Debug)]
pub enum ModelArtifact {
    Vectorizer(Arc<dyn TextVectorizer>),
    LabelEncoder(Arc<dyn LabelEncoding>),
    Classifier(Arc<dyn ScoringModel>),
}

impl ModelArtifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Vectorizer(_) => ArtifactKind::Vectorizer,
            Self::LabelEncoder(_) => ArtifactKind::LabelEncoder,
            Self::Classifier(_) => ArtifactKind::Classifier,
        }
    }
}

/// Immutable holder of the three artifacts, loaded once at startup.
///
/// A store only exists when all three artifacts loaded and agree with each
/// other, so a service built from it never sees a partial configuration.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    vectorizer: Arc<dyn TextVectorizer>,
    label_encoder: Arc<dyn LabelEncoding>,
    classifier: Arc<dyn ScoringModel>,
    metadata: Vec<ArtifactMetadata>,
}

impl ArtifactStore {
    /// Loads and cross-validates all three artifacts.
    ///
    /// Native loading (ONNX session creation) runs under `gate`.
    ///
    /// # Errors
    /// - `ArtifactLoad` if any file is missing, unreadable, fails digest
    ///   verification, has an unsupported format or deserializes to the wrong type
    /// - `IncompatibleArtifacts` / `DimensionMismatch` if the artifacts disagree
    pub fn load(
        paths: &ArtifactPaths,
        config: &RuntimeConfig,
        gate: &RuntimeGate,
    ) -> Result<Self, ClassifierError> {
        log::info!("Loading model artifacts");
        let (vectorizer, vectorizer_meta) =
            load_artifact(ArtifactKind::Vectorizer, &paths.vectorizer, config, gate)?;
        let (label_encoder, encoder_meta) =
            load_artifact(ArtifactKind::LabelEncoder, &paths.label_encoder, config, gate)?;
        let (classifier, classifier_meta) =
            load_artifact(ArtifactKind::Classifier, &paths.classifier, config, gate)?;

        let vectorizer = match vectorizer {
            ModelArtifact::Vectorizer(v) => v,
            other => return Err(wrong_type(vectorizer_meta.kind, &vectorizer_meta.source, other.kind())),
        };
        let label_encoder = match label_encoder {
            ModelArtifact::LabelEncoder(e) => e,
            other => return Err(wrong_type(encoder_meta.kind, &encoder_meta.source, other.kind())),
        };
        let classifier = match classifier {
            ModelArtifact::Classifier(c) => c,
            other => return Err(wrong_type(classifier_meta.kind, &classifier_meta.source, other.kind())),
        };

        Self::assemble(
            vectorizer,
            label_encoder,
            classifier,
            vec![vectorizer_meta, encoder_meta, classifier_meta],
        )
    }

    /// Builds a store from already constructed backends.
    pub fn from_backends(
        vectorizer: Arc<dyn TextVectorizer>,
        label_encoder: Arc<dyn LabelEncoding>,
        classifier: Arc<dyn ScoringModel>,
    ) -> Result<Self, ClassifierError> {
        let metadata = vec![
            ArtifactMetadata::in_memory(ArtifactKind::Vectorizer),
            ArtifactMetadata::in_memory(ArtifactKind::LabelEncoder),
            ArtifactMetadata::in_memory(ArtifactKind::Classifier),
        ];
        Self::assemble(vectorizer, label_encoder, classifier, metadata)
    }

    fn assemble(
        vectorizer: Arc<dyn TextVectorizer>,
        label_encoder: Arc<dyn LabelEncoding>,
        classifier: Arc<dyn ScoringModel>,
        metadata: Vec<ArtifactMetadata>,
    ) -> Result<Self, ClassifierError> {
        if vectorizer.dimension() != classifier.input_dimension() {
            log::error!(
                "Vectorizer produces {} features but classifier expects {}",
                vectorizer.dimension(),
                classifier.input_dimension()
            );
            return Err(ClassifierError::DimensionMismatch {
                expected: classifier.input_dimension(),
                actual: vectorizer.dimension(),
            });
        }
        if classifier.num_classes() != label_encoder.num_classes() {
            return Err(ClassifierError::IncompatibleArtifacts(format!(
                "classifier was trained on {} classes but label encoder knows {}",
                classifier.num_classes(),
                label_encoder.num_classes()
            )));
        }

        log::info!(
            "Artifacts ready: {} features, {} classes",
            vectorizer.dimension(),
            classifier.num_classes()
        );
        Ok(Self {
            vectorizer,
            label_encoder,
            classifier,
            metadata,
        })
    }

    pub fn vectorizer(&self) -> Arc<dyn TextVectorizer> {
        Arc::clone(&self.vectorizer)
    }

    pub fn label_encoder(&self) -> Arc<dyn LabelEncoding> {
        Arc::clone(&self.label_encoder)
    }

    pub fn classifier(&self) -> Arc<dyn ScoringModel> {
        Arc::clone(&self.classifier)
    }

    pub fn metadata(&self) -> &[ArtifactMetadata] {
        &self.metadata
    }

    pub fn num_classes(&self) -> usize {
        self.classifier.num_classes()
    }

    pub fn feature_dimension(&self) -> usize {
        self.vectorizer.dimension()
    }
}

fn wrong_type(slot: ArtifactKind, path: &Path, found: ArtifactKind) -> ClassifierError {
    log::error!("{:?} holds a {} artifact, expected {}", path, found, slot);
    ClassifierError::artifact_load(slot, path, format!("deserialized to a {} artifact", found))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Kind of artifact a JSON document holds, judged by its shape.
fn json_kind(value: &serde_json::Value) -> Option<ArtifactKind> {
    match value {
        serde_json::Value::Array(_) => Some(ArtifactKind::LabelEncoder),
        serde_json::Value::Object(fields) if fields.contains_key("vocabulary") => Some(ArtifactKind::Vectorizer),
        serde_json::Value::Object(fields) if fields.contains_key("coefficients") => Some(ArtifactKind::Classifier),
        serde_json::Value::Object(fields) if fields.contains_key("classes") => Some(ArtifactKind::LabelEncoder),
        _ => None,
    }
}

fn from_json_value<T: DeserializeOwned>(
    slot: ArtifactKind,
    found: ArtifactKind,
    path: &Path,
    value: serde_json::Value,
) -> Result<T, ClassifierError> {
    serde_json::from_value(value).map_err(|e| {
        ClassifierError::artifact_load(slot, path, format!("not a valid {} file: {}", found, e))
    })
}

/// Decodes a JSON artifact into whichever kind its contents describe.
fn decode_json(slot: ArtifactKind, path: &Path, bytes: &[u8]) -> Result<ModelArtifact, ClassifierError> {
    let load_error = |reason: String| ClassifierError::artifact_load(slot, path, reason);

    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| load_error(format!("not valid JSON: {}", e)))?;
    let found = json_kind(&value).ok_or_else(|| load_error("unrecognized artifact contents".to_string()))?;

    let artifact = match found {
        ArtifactKind::Vectorizer => {
            let spec: TfidfSpec = from_json_value(slot, found, path, value)?;
            ModelArtifact::Vectorizer(Arc::new(TfidfVectorizer::from_spec(spec).map_err(load_error)?))
        }
        ArtifactKind::LabelEncoder => {
            let spec: LabelEncoderSpec = from_json_value(slot, found, path, value)?;
            ModelArtifact::LabelEncoder(Arc::new(LabelEncoder::from_spec(spec).map_err(load_error)?))
        }
        ArtifactKind::Classifier => {
            let spec: LinearSpec = from_json_value(slot, found, path, value)?;
            ModelArtifact::Classifier(Arc::new(LinearModel::from_spec(spec).map_err(load_error)?))
        }
    };
    Ok(artifact)
}

/// Reads, verifies and deserializes a single artifact.
///
/// The decoded type is decided by the file contents and format, not by the
/// slot being loaded; the caller checks it against the slot.
fn load_artifact(
    kind: ArtifactKind,
    source: &ArtifactSource,
    config: &RuntimeConfig,
    gate: &RuntimeGate,
) -> Result<(ModelArtifact, ArtifactMetadata), ClassifierError> {
    let path = source.path.as_path();
    log::info!("Loading {} artifact from {:?}", kind, path);

    let bytes = fs::read(path).map_err(|e| {
        log::error!("Failed to read {:?}: {}", path, e);
        ClassifierError::artifact_load(kind, path, e)
    })?;
    let digest = sha256_hex(&bytes);
    log::info!("Read {} bytes, sha256 {}", bytes.len(), digest);

    if let Some(expected) = &source.sha256 {
        if !expected.eq_ignore_ascii_case(&digest) {
            log::error!("{} hash mismatch: expected {}, got {}", kind, expected, digest);
            return Err(ClassifierError::artifact_load(
                kind,
                path,
                format!("hash mismatch: expected {}, got {}", expected, digest),
            ));
        }
    }

    let format = ArtifactFormat::from_path(path).ok_or_else(|| {
        ClassifierError::artifact_load(kind, path, "unsupported file extension (expected .json or .onnx)")
    })?;

    let artifact = match format {
        ArtifactFormat::Json => decode_json(kind, path, &bytes)?,
        // ONNX files only ever hold classifiers.
        ArtifactFormat::Onnx if kind != ArtifactKind::Classifier => {
            return Err(wrong_type(kind, path, ArtifactKind::Classifier));
        }
        ArtifactFormat::Onnx => {
            let model = gate
                .with_exclusive_access(|| OnnxModel::load(path, config))
                .map_err(|reason| ClassifierError::artifact_load(kind, path, reason))?;
            ModelArtifact::Classifier(Arc::new(model))
        }
        ArtifactFormat::InMemory => {
            return Err(ClassifierError::artifact_load(kind, path, "in-memory artifacts have no file form"));
        }
    };

    let metadata = ArtifactMetadata {
        kind,
        source: path.to_path_buf(),
        format,
        sha256: digest,
        size_bytes: bytes.len() as u64,
        loaded_at: SystemTime::now(),
    };
    Ok((artifact, metadata))
}
