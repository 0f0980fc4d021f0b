use serde::Serialize;

use crate::artifact_store::ArtifactMetadata;

mod error;
mod features;
mod labels;
mod model;
mod ranking;
mod service;
pub mod builder;
mod utils;

pub use builder::ClassificationServiceBuilder;
pub use error::ClassifierError;
pub use features::{FeatureTransformer, FeatureVector, Norm, TextVectorizer, TfidfSpec, TfidfVectorizer};
pub use labels::{LabelDecoder, LabelEncoder, LabelEncoderSpec, LabelEncoding, LabelResult};
pub use model::{Classifier, LinearModel, LinearSpec, OnnxModel, ScoreDistribution, ScoringModel};
pub use ranking::{select_top_k, ScoredClass, TopKResult};
pub use service::{ClassificationService, DEFAULT_TOP_K};

/// Information about the loaded artifacts and configuration of a service
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    /// Number of classes the classifier was trained on
    pub num_classes: usize,
    /// Width of the feature vectors
    pub feature_dimension: usize,
    /// Labels returned when no k is requested
    pub default_k: usize,
    /// Callers currently waiting on the runtime gate
    pub gate_queue_depth: usize,
    /// Provenance of the vectorizer, label encoder and classifier
    pub artifacts: Vec<ArtifactMetadata>,
}
