use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use crate::runtime::RuntimeGate;

/// Ordered labels returned to the caller, one per ranked class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LabelResult(Vec<String>);

impl LabelResult {
    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for LabelResult {
    fn from(labels: Vec<String>) -> Self {
        Self(labels)
    }
}

/// Capability interface of a label-encoder artifact.
pub trait LabelEncoding: Send + Sync + fmt::Debug {
    /// Size of the class-index domain
    fn num_classes(&self) -> usize;

    /// Maps class indices to labels. This is a native call and must run under the gate.
    fn inverse_transform(&self, indices: &[usize]) -> Result<Vec<String>, ClassifierError>;
}

/// On-disk form of a label encoder: the ordered class list, bare or wrapped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LabelEncoderSpec {
    Classes(Vec<String>),
    Wrapped { classes: Vec<String> },
}

/// Label encoder holding the trained class list; index `i` decodes to `classes[i]`.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn from_spec(spec: LabelEncoderSpec) -> Result<Self, String> {
        let classes = match spec {
            LabelEncoderSpec::Classes(classes) | LabelEncoderSpec::Wrapped { classes } => classes,
        };
        Self::new(classes)
    }

    pub fn new(classes: Vec<String>) -> Result<Self, String> {
        if classes.is_empty() {
            return Err("label encoder has no classes".into());
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = classes.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(format!("duplicate class label '{}'", duplicate));
        }
        Ok(Self { classes })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

impl LabelEncoding for LabelEncoder {
    fn num_classes(&self) -> usize {
        self.classes.len()
    }

    fn inverse_transform(&self, indices: &[usize]) -> Result<Vec<String>, ClassifierError> {
        indices
            .iter()
            .map(|&index| {
                self.classes
                    .get(index)
                    .cloned()
                    .ok_or(ClassifierError::UnknownClassIndex {
                        index,
                        known: self.classes.len(),
                    })
            })
            .collect()
    }
}

/// Pipeline stage mapping ranked class indices back to labels.
#[derive(Debug, Clone)]
pub struct LabelDecoder {
    encoder: Arc<dyn LabelEncoding>,
    gate: Arc<RuntimeGate>,
}

impl LabelDecoder {
    pub fn new(encoder: Arc<dyn LabelEncoding>, gate: Arc<RuntimeGate>) -> Self {
        Self { encoder, gate }
    }

    pub fn num_classes(&self) -> usize {
        self.encoder.num_classes()
    }

    /// Decodes `indices` in order under the runtime gate.
    ///
    /// # Errors
    /// - `UnknownClassIndex` if any index is outside the encoder's domain,
    ///   checked before the encoder is called
    /// - `NativeRuntime` if the encoder fails or drops labels
    pub fn decode(&self, indices: &[usize]) -> Result<LabelResult, ClassifierError> {
        let known = self.num_classes();
        if let Some(&index) = indices.iter().find(|&&i| i >= known) {
            return Err(ClassifierError::UnknownClassIndex { index, known });
        }

        let labels = self
            .gate
            .with_exclusive_access(|| self.encoder.inverse_transform(indices))?;

        if labels.len() != indices.len() {
            return Err(ClassifierError::NativeRuntime(format!(
                "label encoder returned {} labels for {} indices",
                labels.len(),
                indices.len()
            )));
        }
        Ok(LabelResult(labels))
    }
}
