use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView1};
use ort::session::Session;
use ort::value::{Tensor, ValueType};
use serde::Deserialize;

use super::error::ClassifierError;
use super::features::FeatureVector;
use super::utils::softmax;
use crate::runtime::{create_session_builder, RuntimeConfig, RuntimeGate};

/// Scores over every class the classifier was trained on, indexed by class.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreDistribution {
    scores: Vec<f32>,
}

impl ScoreDistribution {
    pub fn new(scores: Vec<f32>) -> Self {
        Self { scores }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn score(&self, class_index: usize) -> Option<f32> {
        self.scores.get(class_index).copied()
    }

    /// Iterates over `(class_index, score)` pairs in class order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.scores.iter().copied().enumerate()
    }

    /// Builds a distribution from `(class_index, score)` pairs in any order.
    ///
    /// The pairs must name every index in `0..pairs.len()` exactly once.
    ///
    /// # Errors
    /// `NativeRuntime` if an index is out of range or repeated.
    pub fn from_pairs(pairs: Vec<(usize, f32)>) -> Result<Self, ClassifierError> {
        let num_classes = pairs.len();
        let mut scores: Vec<Option<f32>> = vec![None; num_classes];
        for (index, score) in pairs {
            match scores.get_mut(index) {
                Some(slot @ None) => *slot = Some(score),
                Some(Some(_)) => {
                    return Err(ClassifierError::NativeRuntime(format!(
                        "class {} scored more than once",
                        index
                    )))
                }
                None => {
                    return Err(ClassifierError::NativeRuntime(format!(
                        "class {} outside 0..{}",
                        index,
                        num_classes
                    )))
                }
            }
        }
        // Every slot is filled: n distinct in-range indices over n slots.
        Ok(Self {
            scores: scores.into_iter().flatten().collect(),
        })
    }
}

/// Capability interface of a classifier artifact.
pub trait ScoringModel: Send + Sync + fmt::Debug {
    /// Number of features the model expects
    fn input_dimension(&self) -> usize;

    /// Number of classes the model was trained on
    fn num_classes(&self) -> usize;

    /// Class probabilities for one feature vector. This is a native call and must run under the gate.
    fn predict_proba(&self, features: ArrayView1<'_, f32>) -> Result<Vec<f32>, ClassifierError>;
}

/// On-disk form of a multinomial linear model.
#[derive(Debug, Deserialize)]
pub struct LinearSpec {
    /// One row of weights per class
    pub coefficients: Vec<Vec<f32>>,
    pub intercept: Vec<f32>,
}

/// Multinomial linear classifier scored with softmax.
#[derive(Debug)]
pub struct LinearModel {
    weights: Array2<f32>,
    intercept: Array1<f32>,
}

impl LinearModel {
    pub fn from_spec(spec: LinearSpec) -> Result<Self, String> {
        let num_classes = spec.coefficients.len();
        if num_classes == 0 {
            return Err("model has no classes".into());
        }
        let width = spec.coefficients[0].len();
        if width == 0 {
            return Err("model has no features".into());
        }
        if let Some(row) = spec.coefficients.iter().position(|r| r.len() != width) {
            return Err(format!("coefficient row {} does not have {} weights", row, width));
        }
        if spec.intercept.len() != num_classes {
            return Err(format!(
                "intercept has {} entries but model has {} classes",
                spec.intercept.len(),
                num_classes
            ));
        }

        let flat: Vec<f32> = spec.coefficients.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((num_classes, width), flat)
            .map_err(|e| format!("failed to shape coefficients: {}", e))?;
        Ok(Self {
            weights,
            intercept: Array1::from(spec.intercept),
        })
    }
}

impl ScoringModel for LinearModel {
    fn input_dimension(&self) -> usize {
        self.weights.ncols()
    }

    fn num_classes(&self) -> usize {
        self.weights.nrows()
    }

    fn predict_proba(&self, features: ArrayView1<'_, f32>) -> Result<Vec<f32>, ClassifierError> {
        let logits = self.weights.dot(&features) + &self.intercept;
        Ok(softmax(&logits).to_vec())
    }
}

/// Gradient-boosted classifier exported to ONNX and run through ONNX Runtime.
///
/// The model is expected to:
/// - Accept one float input of shape [batch_size, n_features]
/// - Emit class probabilities of shape [batch_size, n_classes], named
///   `probabilities` or as the last output
pub struct OnnxModel {
    session: Session,
    input_name: String,
    output_name: String,
    input_dimension: usize,
    num_classes: usize,
}

impl fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxModel")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("input_dimension", &self.input_dimension)
            .field("num_classes", &self.num_classes)
            .finish()
    }
}

/// Last axis of a tensor type, when it is fixed.
fn fixed_width(value_type: &ValueType) -> Option<usize> {
    match value_type {
        ValueType::Tensor { dimensions, .. } => dimensions
            .last()
            .and_then(|&d| usize::try_from(d).ok())
            .filter(|&d| d > 0),
        _ => None,
    }
}

impl OnnxModel {
    /// Creates an ONNX Runtime session for the model and validates its structure.
    ///
    /// Must be called under the runtime gate.
    pub fn load(path: &Path, config: &RuntimeConfig) -> Result<Self, String> {
        let session = create_session_builder(config)
            .and_then(|builder| builder.commit_from_file(path).map_err(ClassifierError::from))
            .map_err(|e| e.to_string())?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| "model declares no inputs".to_string())?;
        let input_dimension = fixed_width(&input.input_type)
            .ok_or_else(|| format!("input '{}' has no fixed feature dimension", input.name))?;

        let output = session
            .outputs
            .iter()
            .find(|o| o.name == "probabilities")
            .or_else(|| session.outputs.last())
            .ok_or_else(|| "model declares no outputs".to_string())?;
        let num_classes = fixed_width(&output.output_type)
            .ok_or_else(|| format!("output '{}' has no fixed class dimension", output.name))?;

        log::info!(
            "ONNX classifier: input '{}' [{}], output '{}' [{}]",
            input.name,
            input_dimension,
            output.name,
            num_classes
        );

        let input_name = input.name.clone();
        let output_name = output.name.clone();
        Ok(Self {
            input_name,
            output_name,
            input_dimension,
            num_classes,
            session,
        })
    }
}

impl ScoringModel for OnnxModel {
    fn input_dimension(&self) -> usize {
        self.input_dimension
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn predict_proba(&self, features: ArrayView1<'_, f32>) -> Result<Vec<f32>, ClassifierError> {
        let input_array = Array2::from_shape_vec((1, features.len()), features.to_vec())
            .map_err(|e| ClassifierError::NativeRuntime(format!("Failed to create input array: {}", e)))?;

        let mut input_tensors = HashMap::new();
        input_tensors.insert(self.input_name.as_str(), Tensor::from_array(input_array)?);

        let outputs = self.session.run(input_tensors)?;
        let probabilities = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;
        Ok(probabilities.iter().copied().collect())
    }
}

/// Pipeline stage producing a [`ScoreDistribution`] for a [`FeatureVector`].
#[derive(Debug, Clone)]
pub struct Classifier {
    model: Arc<dyn ScoringModel>,
    gate: Arc<RuntimeGate>,
}

impl Classifier {
    pub fn new(model: Arc<dyn ScoringModel>, gate: Arc<RuntimeGate>) -> Self {
        Self { model, gate }
    }

    pub fn input_dimension(&self) -> usize {
        self.model.input_dimension()
    }

    pub fn num_classes(&self) -> usize {
        self.model.num_classes()
    }

    /// Scores `features` under the runtime gate.
    ///
    /// # Errors
    /// - `DimensionMismatch` if the vector width differs from the model's input width
    /// - `NativeRuntime` if the model fails or returns the wrong number of scores
    pub fn score(&self, features: &FeatureVector) -> Result<ScoreDistribution, ClassifierError> {
        let expected = self.input_dimension();
        if features.dimension() != expected {
            return Err(ClassifierError::DimensionMismatch {
                expected,
                actual: features.dimension(),
            });
        }

        let scores = self
            .gate
            .with_exclusive_access(|| self.model.predict_proba(features.view()))?;

        if scores.len() != self.num_classes() {
            return Err(ClassifierError::NativeRuntime(format!(
                "classifier returned {} scores for {} classes",
                scores.len(),
                self.num_classes()
            )));
        }
        Ok(ScoreDistribution::new(scores))
    }
}
