use std::sync::Arc;

use super::builder::ClassificationServiceBuilder;
use super::error::ClassifierError;
use super::features::FeatureTransformer;
use super::labels::{LabelDecoder, LabelResult};
use super::model::Classifier;
use super::ranking::{select_top_k, TopKResult};
use super::ServiceInfo;
use crate::artifact_store::ArtifactMetadata;
use crate::runtime::RuntimeGate;

/// Number of labels returned when the caller does not ask for a specific count.
pub const DEFAULT_TOP_K: usize = 5;

/// Top-K text classification over the loaded artifacts.
///
/// # Thread Safety
///
/// The service is `Send + Sync` and meant to be shared through `Arc`. Each
/// request runs its own pipeline; only the three artifact calls
/// (vectorize, score, decode) are serialized, each one separately, through the
/// shared [`RuntimeGate`]. Validation and ranking run in parallel.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use team_classifier::{ArtifactPaths, ClassificationService};
///
/// let service = ClassificationService::builder()
///     .with_artifacts(&ArtifactPaths::from_dir("MLModels"))?
///     .build()?;
///
/// let teams = service.classify("VPN keeps disconnecting after the update", 5)?;
/// println!("{:?}", teams.labels());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClassificationService {
    pub(crate) transformer: FeatureTransformer,
    pub(crate) classifier: Classifier,
    pub(crate) decoder: LabelDecoder,
    pub(crate) gate: Arc<RuntimeGate>,
    pub(crate) default_k: usize,
    pub(crate) artifacts: Vec<ArtifactMetadata>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<ClassificationService>();
    }
};

impl ClassificationService {
    /// Creates a new ClassificationServiceBuilder for fluent construction
    pub fn builder() -> ClassificationServiceBuilder {
        ClassificationServiceBuilder::new()
    }

    /// Returns the `k` most likely labels for `text`, best first.
    ///
    /// Returns `min(k, num_classes)` labels.
    ///
    /// # Errors
    /// - `EmptyInput` if the text is blank
    /// - `InvalidTopK` if `k` is zero
    /// - `DimensionMismatch`, `UnknownClassIndex` or `NativeRuntime` on server faults
    pub fn classify(&self, text: &str, k: usize) -> Result<LabelResult, ClassifierError> {
        let ranked = self.rank(text, k)?;
        self.decoder.decode(&ranked.indices())
    }

    /// Same as [`classify`](Self::classify) with the configured default `k`.
    pub fn classify_default(&self, text: &str) -> Result<LabelResult, ClassifierError> {
        self.classify(text, self.default_k)
    }

    /// Returns `(label, score)` pairs for the `k` most likely labels, best first.
    pub fn classify_scored(&self, text: &str, k: usize) -> Result<Vec<(String, f32)>, ClassifierError> {
        let ranked = self.rank(text, k)?;
        let labels = self.decoder.decode(&ranked.indices())?;
        Ok(labels
            .into_inner()
            .into_iter()
            .zip(ranked.entries().iter().map(|e| e.score))
            .collect())
    }

    fn rank(&self, text: &str, k: usize) -> Result<TopKResult, ClassifierError> {
        if text.trim().is_empty() {
            return Err(ClassifierError::EmptyInput);
        }
        if k == 0 {
            return Err(ClassifierError::InvalidTopK(k));
        }

        let features = self.transformer.transform(text)?;
        let distribution = self.classifier.score(&features)?;
        log::debug!(
            "Scored {} classes from {} features",
            distribution.len(),
            features.dimension()
        );
        select_top_k(&distribution, k)
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    pub fn num_classes(&self) -> usize {
        self.classifier.num_classes()
    }

    /// The gate this service serializes its artifact calls through.
    pub fn gate(&self) -> &Arc<RuntimeGate> {
        &self.gate
    }

    /// Returns information about the service's loaded artifacts
    pub fn info(&self) -> ServiceInfo {
        ServiceInfo {
            num_classes: self.num_classes(),
            feature_dimension: self.transformer.dimension(),
            default_k: self.default_k,
            gate_queue_depth: self.gate.queue_depth(),
            artifacts: self.artifacts.clone(),
        }
    }
}
