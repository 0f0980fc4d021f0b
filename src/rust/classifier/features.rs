use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ndarray::{Array1, ArrayView1};
use regex::Regex;
use serde::Deserialize;

use super::error::ClassifierError;
use super::utils::{l1_normalize_vector, normalize_vector};
use crate::runtime::RuntimeGate;

/// A dense feature vector produced from one input text.
///
/// The dimension always equals the vectorizer's vocabulary size.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Array1<f32>,
}

impl FeatureVector {
    pub fn new(values: Array1<f32>) -> Self {
        Self { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn view(&self) -> ArrayView1<'_, f32> {
        self.values.view()
    }

    pub fn into_inner(self) -> Array1<f32> {
        self.values
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self::new(Array1::from(values))
    }
}

/// Capability interface of a vectorizer artifact.
pub trait TextVectorizer: Send + Sync + fmt::Debug {
    /// Width of every vector this vectorizer produces
    fn dimension(&self) -> usize;

    /// Converts text into a feature vector. This is a native call and must run under the gate.
    fn transform(&self, text: &str) -> Result<Array1<f32>, ClassifierError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

fn default_token_pattern() -> String {
    r"(?u)\b\w\w+\b".to_string()
}

fn default_true() -> bool {
    true
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

/// On-disk form of an exported TF-IDF vectorizer.
#[derive(Debug, Deserialize)]
pub struct TfidfSpec {
    pub vocabulary: HashMap<String, usize>,
    #[serde(default)]
    pub idf: Vec<f32>,
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default = "default_true")]
    pub use_idf: bool,
    #[serde(default = "default_norm")]
    pub norm: Option<Norm>,
    #[serde(default)]
    pub stop_words: Vec<String>,
}

/// TF-IDF vectorizer reproducing the exported model's transform step.
#[derive(Debug)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Option<Array1<f32>>,
    lowercase: bool,
    token_pattern: Regex,
    ngram_range: (usize, usize),
    sublinear_tf: bool,
    norm: Option<Norm>,
    stop_words: Vec<String>,
}

impl TfidfVectorizer {
    /// Validates an exported specification and builds the vectorizer.
    ///
    /// # Errors
    /// Returns a plain message when the vocabulary is empty or inconsistent,
    /// the idf weights do not match the vocabulary, the n-gram range is invalid
    /// or the token pattern does not compile. The caller wraps it into an
    /// artifact load error.
    pub fn from_spec(spec: TfidfSpec) -> Result<Self, String> {
        let dimension = spec.vocabulary.len();
        if dimension == 0 {
            return Err("vocabulary is empty".into());
        }
        let mut seen = vec![false; dimension];
        for (term, &index) in &spec.vocabulary {
            if index >= dimension || seen[index] {
                return Err(format!("term '{}' has invalid or duplicate index {}", term, index));
            }
            seen[index] = true;
        }

        let idf = if spec.use_idf {
            if spec.idf.len() != dimension {
                return Err(format!(
                    "idf has {} weights but vocabulary has {} terms",
                    spec.idf.len(),
                    dimension
                ));
            }
            Some(Array1::from(spec.idf))
        } else {
            None
        };

        let (min_n, max_n) = spec.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(format!("invalid ngram_range ({}, {})", min_n, max_n));
        }

        let token_pattern = Regex::new(&spec.token_pattern)
            .map_err(|e| format!("invalid token_pattern: {}", e))?;

        Ok(Self {
            vocabulary: spec.vocabulary,
            idf,
            lowercase: spec.lowercase,
            token_pattern,
            ngram_range: spec.ngram_range,
            sublinear_tf: spec.sublinear_tf,
            norm: spec.norm,
            stop_words: spec.stop_words,
        })
    }

    fn analyze(&self, text: &str) -> Vec<String> {
        let text = if self.lowercase { text.to_lowercase() } else { text.to_string() };
        let tokens: Vec<&str> = self
            .token_pattern
            .find_iter(&text)
            .map(|m| m.as_str())
            .filter(|token| !self.stop_words.iter().any(|stop| stop == token))
            .collect();

        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n {
            if n > tokens.len() {
                break;
            }
            terms.extend(tokens.windows(n).map(|window| window.join(" ")));
        }
        terms
    }
}

impl TextVectorizer for TfidfVectorizer {
    fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    fn transform(&self, text: &str) -> Result<Array1<f32>, ClassifierError> {
        let mut counts: Array1<f32> = Array1::zeros(self.dimension());
        for term in self.analyze(text) {
            if let Some(&index) = self.vocabulary.get(&term) {
                counts[index] += 1.0;
            }
        }

        if self.sublinear_tf {
            counts.mapv_inplace(|tf| if tf > 0.0 { 1.0 + tf.ln() } else { 0.0 });
        }
        if let Some(idf) = &self.idf {
            counts *= idf;
        }

        Ok(match self.norm {
            Some(Norm::L2) => normalize_vector(&counts),
            Some(Norm::L1) => l1_normalize_vector(&counts),
            None => counts,
        })
    }
}

/// Pipeline stage turning raw text into a [`FeatureVector`].
#[derive(Debug, Clone)]
pub struct FeatureTransformer {
    vectorizer: Arc<dyn TextVectorizer>,
    gate: Arc<RuntimeGate>,
}

impl FeatureTransformer {
    pub fn new(vectorizer: Arc<dyn TextVectorizer>, gate: Arc<RuntimeGate>) -> Self {
        Self { vectorizer, gate }
    }

    pub fn dimension(&self) -> usize {
        self.vectorizer.dimension()
    }

    /// Transforms `text` under the runtime gate.
    ///
    /// # Errors
    /// - `EmptyInput` if the text is blank
    /// - `NativeRuntime` if the vectorizer fails or returns the wrong width
    pub fn transform(&self, text: &str) -> Result<FeatureVector, ClassifierError> {
        if text.trim().is_empty() {
            return Err(ClassifierError::EmptyInput);
        }

        let values = self
            .gate
            .with_exclusive_access(|| self.vectorizer.transform(text))?;

        let expected = self.dimension();
        if values.len() != expected {
            return Err(ClassifierError::NativeRuntime(format!(
                "vectorizer produced {} features, expected {}",
                values.len(),
                expected
            )));
        }
        Ok(FeatureVector::new(values))
    }
}
