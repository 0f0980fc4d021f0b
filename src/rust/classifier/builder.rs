use std::sync::Arc;

use log::info;

use super::error::ClassifierError;
use super::features::FeatureTransformer;
use super::labels::LabelDecoder;
use super::model::Classifier;
use super::service::{ClassificationService, DEFAULT_TOP_K};
use crate::artifact_store::{ArtifactPaths, ArtifactStore};
use crate::runtime::{RuntimeConfig, RuntimeGate};

/// A builder for constructing a ClassificationService with a fluent interface.
#[derive(Debug)]
pub struct ClassificationServiceBuilder {
    store: Option<ArtifactStore>,
    gate: Arc<RuntimeGate>,
    runtime_config: RuntimeConfig,
    default_k: usize,
}

impl Default for ClassificationServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassificationServiceBuilder {
    /// Creates a builder using the process-wide gate and default runtime settings
    ///
    /// # Example
    /// ```
    /// use team_classifier::ClassificationServiceBuilder;
    ///
    /// let builder = ClassificationServiceBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            store: None,
            gate: RuntimeGate::global(),
            runtime_config: RuntimeConfig::default(),
            default_k: DEFAULT_TOP_K,
        }
    }

    /// Sets the runtime configuration used when native artifacts are loaded.
    ///
    /// Call order matters: `with_runtime_config` and [`with_gate`](Self::with_gate)
    /// must come before [`with_artifacts`](Self::with_artifacts), which creates
    /// native sessions with the configuration and gate set at that point.
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Replaces the process-wide gate, e.g. to isolate a service in tests.
    /// Must be called before [`with_artifacts`](Self::with_artifacts) so that
    /// loading and serving share one gate.
    pub fn with_gate(mut self, gate: Arc<RuntimeGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Sets how many labels [`ClassificationService::classify_default`] returns.
    ///
    /// # Errors
    /// `InvalidTopK` if `k` is zero.
    pub fn with_default_k(mut self, k: usize) -> Result<Self, ClassifierError> {
        if k == 0 {
            return Err(ClassifierError::InvalidTopK(k));
        }
        self.default_k = k;
        Ok(self)
    }

    /// Loads all three artifacts from `paths`.
    ///
    /// # Errors
    /// - `IncompatibleArtifacts` if a store was already set
    /// - any error from [`ArtifactStore::load`]
    pub fn with_artifacts(mut self, paths: &ArtifactPaths) -> Result<Self, ClassifierError> {
        self.ensure_no_store()?;
        let store = ArtifactStore::load(paths, &self.runtime_config, &self.gate)?;
        info!("Artifact store loaded successfully");
        self.store = Some(store);
        Ok(self)
    }

    /// Uses an already assembled store.
    ///
    /// # Errors
    /// `IncompatibleArtifacts` if a store was already set
    pub fn with_store(mut self, store: ArtifactStore) -> Result<Self, ClassifierError> {
        self.ensure_no_store()?;
        self.store = Some(store);
        Ok(self)
    }

    fn ensure_no_store(&self) -> Result<(), ClassifierError> {
        if self.store.is_some() {
            return Err(ClassifierError::IncompatibleArtifacts("Artifacts already loaded".to_string()));
        }
        Ok(())
    }

    /// Builds and returns the final ClassificationService instance
    ///
    /// # Errors
    /// `IncompatibleArtifacts` if no artifacts were provided.
    pub fn build(self) -> Result<ClassificationService, ClassifierError> {
        let store = self.store.ok_or_else(|| {
            ClassifierError::IncompatibleArtifacts("No artifacts loaded".to_string())
        })?;

        let transformer = FeatureTransformer::new(store.vectorizer(), Arc::clone(&self.gate));
        let classifier = Classifier::new(store.classifier(), Arc::clone(&self.gate));
        let decoder = LabelDecoder::new(store.label_encoder(), Arc::clone(&self.gate));

        info!(
            "Classification service ready: {} classes, {} features, default k = {}",
            classifier.num_classes(),
            transformer.dimension(),
            self.default_k
        );

        Ok(ClassificationService {
            transformer,
            classifier,
            decoder,
            gate: self.gate,
            default_k: self.default_k,
            artifacts: store.metadata().to_vec(),
        })
    }
}
