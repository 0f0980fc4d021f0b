use std::path::PathBuf;

use ort::Error as OrtError;

use crate::artifact_store::ArtifactKind;

/// Represents the different types of errors that can occur in the classification pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// An artifact was missing, unreadable, corrupt or of the wrong type
    #[error("Failed to load {kind} artifact from {path:?}: {reason}")]
    ArtifactLoad {
        kind: ArtifactKind,
        path: PathBuf,
        reason: String,
    },
    /// The loaded artifacts disagree with each other
    #[error("Incompatible artifacts: {0}")]
    IncompatibleArtifacts(String),
    /// The input text was empty or blank
    #[error("Description cannot be empty")]
    EmptyInput,
    /// The requested number of results was zero
    #[error("k must be a positive integer, got {0}")]
    InvalidTopK(usize),
    /// The feature vector width differs from what the classifier expects
    #[error("Feature dimension mismatch: classifier expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// A class index fell outside the label encoder's domain
    #[error("Unknown class index {index} (label encoder knows {known} classes)")]
    UnknownClassIndex { index: usize, known: usize },
    /// Unclassified failure from the wrapped runtime
    #[error("Native runtime fault: {0}")]
    NativeRuntime(String),
}

impl ClassifierError {
    /// Returns true for errors caused by the caller's request rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyInput | Self::InvalidTopK(_))
    }

    pub(crate) fn artifact_load(
        kind: ArtifactKind,
        path: impl Into<PathBuf>,
        reason: impl ToString,
    ) -> Self {
        Self::ArtifactLoad {
            kind,
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::NativeRuntime(err.to_string())
    }
}
