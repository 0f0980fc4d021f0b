use std::cmp::Ordering;

use serde::Serialize;

use super::error::ClassifierError;
use super::model::ScoreDistribution;

/// A class index paired with its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredClass {
    pub index: usize,
    pub score: f32,
}

/// The highest-scoring classes in rank order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TopKResult {
    entries: Vec<ScoredClass>,
}

impl TopKResult {
    pub fn entries(&self) -> &[ScoredClass] {
        &self.entries
    }

    pub fn indices(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.index).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Orders by score descending, then class index ascending. NaN sorts after every number.
fn rank_order(a: &ScoredClass, b: &ScoredClass) -> Ordering {
    let by_score = match (a.score.is_nan(), b.score.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
    };
    by_score.then_with(|| a.index.cmp(&b.index))
}

/// Selects the `k` highest-scoring classes.
///
/// `k` larger than the number of classes is clamped. Equal scores are ranked by
/// ascending class index, so identical input always gives identical output.
///
/// # Errors
/// `InvalidTopK` when `k` is zero.
pub fn select_top_k(distribution: &ScoreDistribution, k: usize) -> Result<TopKResult, ClassifierError> {
    if k == 0 {
        return Err(ClassifierError::InvalidTopK(k));
    }

    let mut entries: Vec<ScoredClass> = distribution
        .entries()
        .map(|(index, score)| ScoredClass { index, score })
        .collect();
    let k = k.min(entries.len());

    if k < entries.len() {
        entries.select_nth_unstable_by(k, rank_order);
        entries.truncate(k);
    }
    entries.sort_by(rank_order);

    Ok(TopKResult { entries })
}
