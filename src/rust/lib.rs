//! Top-K team classification over a TF-IDF vectorizer, a label encoder and a
//! gradient-boosted classifier.
//!
//! The three artifacts are loaded once into an [`ArtifactStore`]. Every call
//! into them goes through a [`RuntimeGate`], because the native runtime allows
//! a single caller at a time. A request flows
//! text → [`FeatureVector`] → [`ScoreDistribution`] → [`TopKResult`] → [`LabelResult`].
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use team_classifier::{ArtifactPaths, ClassificationService};
//!
//! let service = ClassificationService::builder()
//!     .with_artifacts(&ArtifactPaths::from_dir("MLModels"))?
//!     .build()?;
//!
//! let teams = service.classify("Cannot log in to the payroll portal", 5)?;
//! for team in teams.labels() {
//!     println!("{}", team);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! The service can be shared across threads using `Arc`:
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use team_classifier::{ArtifactPaths, ClassificationService};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let service = Arc::new(ClassificationService::builder()
//!     .with_artifacts(&ArtifactPaths::default())?
//!     .build()?);
//!
//! let mut handles = vec![];
//! for _ in 0..3 {
//!     let service = Arc::clone(&service);
//!     handles.push(thread::spawn(move || {
//!         service.classify("printer is offline", 3).unwrap();
//!     }));
//! }
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! # Ok(())
//! # }
//! ```

pub mod artifact_store;
pub mod classifier;
mod runtime;
pub mod server;

pub use artifact_store::{
    ArtifactFormat, ArtifactKind, ArtifactMetadata, ArtifactPaths, ArtifactSource, ArtifactStore,
    ModelArtifact,
};
pub use classifier::{
    select_top_k, ClassificationService, ClassificationServiceBuilder, Classifier, ClassifierError,
    FeatureTransformer, FeatureVector, LabelDecoder, LabelEncoder, LabelEncoding, LabelResult,
    LinearModel, ScoreDistribution, ScoredClass, ScoringModel, ServiceInfo, TextVectorizer,
    TfidfVectorizer, TopKResult, DEFAULT_TOP_K,
};
pub use runtime::{create_session_builder, ensure_initialized, RuntimeConfig, RuntimeGate};
pub use server::create_router;
pub use ort::session::builder::GraphOptimizationLevel;

pub fn init_logger() {
    env_logger::init();
}
