//! Value signatures
//!
//! A signature is a fixed-size sketch of a field's value distribution, computed once per
//! field at ingestion. Numeric fields keep an evenly spaced quantile digest and compare
//! with a two-sample Kolmogorov-Smirnov statistic. Textual fields keep a signed hashed
//! token vector and compare with cosine similarity.
//!
//! All functions are pure: the same values and size always produce the same sketch.
//! Empty input produces a neutral sketch that is similar to nothing.

use ahash::RandomState;
use serde::{Deserialize, Serialize};
use std::hash::BuildHasher;

use crate::config::SimilarityConfig;

/// Kind of values held by a field, fixed at ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Numeric,
    Textual,
}

/// Numeric if every value parses as a finite float, textual otherwise.
///
/// An empty sequence is vacuously numeric.
pub fn classify<S: AsRef<str>>(values: &[S]) -> ValueKind {
    if values.iter().all(|v| parse_number(v.as_ref()).is_some()) {
        ValueKind::Numeric
    } else {
        ValueKind::Textual
    }
}

#[inline]
pub fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Quantile digest of a numeric field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSketch {
    /// Number of values the digest summarizes
    pub count: u64,
    /// `size` ascending quantiles, evenly spaced from min to max
    pub quantiles: Vec<f64>,
}

impl NumericSketch {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Hashed token vector of a textual field, unit length unless empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSketch {
    pub vector: Vec<f32>,
}

impl TextSketch {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vector.iter().all(|v| *v == 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "sketch", rename_all = "lowercase")]
pub enum Signature {
    Numeric(NumericSketch),
    Textual(TextSketch),
}

impl Signature {
    /// Classify raw values and build the matching sketch
    pub fn compute<S: AsRef<str>>(values: &[S], size: usize) -> Self {
        match classify(values) {
            ValueKind::Numeric => {
                let numbers: Vec<f64> = values
                    .iter()
                    .filter_map(|v| parse_number(v.as_ref()))
                    .collect();
                Signature::Numeric(numeric_signature(&numbers, size))
            }
            ValueKind::Textual => Signature::Textual(textual_signature(values, size)),
        }
    }

    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Signature::Numeric(_) => ValueKind::Numeric,
            Signature::Textual(_) => ValueKind::Textual,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        match self {
            Signature::Numeric(s) => s.is_empty(),
            Signature::Textual(s) => s.is_empty(),
        }
    }
}

/// Build a quantile digest with `size` points
pub fn numeric_signature(values: &[f64], size: usize) -> NumericSketch {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() || size == 0 {
        return NumericSketch {
            count: 0,
            quantiles: vec![0.0; size],
        };
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let last = (sorted.len() - 1) as f64;
    let quantiles = (0..size)
        .map(|k| {
            let q = if size == 1 { 0.5 } else { k as f64 / (size - 1) as f64 };
            sorted[(q * last).round() as usize]
        })
        .collect();

    NumericSketch {
        count: sorted.len() as u64,
        quantiles,
    }
}

/// Build a signed hashed token vector with `size` buckets
pub fn textual_signature<S: AsRef<str>>(values: &[S], size: usize) -> TextSketch {
    let mut vector = vec![0.0f32; size];
    if size == 0 {
        return TextSketch { vector };
    }

    let hasher = token_hasher();
    for value in values {
        for token in tokenize(value.as_ref()) {
            let hash = hasher.hash_one(token.as_str());
            let pos = (hash % size as u64) as usize;
            // Top bit picks the sign so collisions cancel in expectation
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[pos] += sign;
        }
    }

    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for v in &mut vector {
            *v /= magnitude;
        }
    }

    TextSketch { vector }
}

// Fixed seeds keep sketches reproducible within a build. Sketches are never persisted.
fn token_hasher() -> RandomState {
    RandomState::with_seeds(
        0x243f_6a88_85a3_08d3,
        0x1319_8a2e_0370_7344,
        0xa409_3822_299f_31d0,
        0x082e_fa98_ec4e_6c89,
    )
}

/// Lowercase alphanumeric tokens of a value
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Two-sample Kolmogorov-Smirnov statistic between two quantile digests
pub fn ks_statistic(a: &NumericSketch, b: &NumericSketch) -> f64 {
    let (qa, qb) = (&a.quantiles, &b.quantiles);
    if qa.is_empty() || qb.is_empty() {
        return 1.0;
    }
    let (na, nb) = (qa.len() as f64, qb.len() as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;

    while i < qa.len() && j < qb.len() {
        let x = qa[i].min(qb[j]);
        while i < qa.len() && qa[i] <= x {
            i += 1;
        }
        while j < qb.len() && qb[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / na - j as f64 / nb).abs());
    }
    d
}

/// Cosine similarity between two textual sketches
pub fn cosine(a: &TextSketch, b: &TextSketch) -> f32 {
    if a.vector.len() != b.vector.len() {
        return 0.0;
    }
    let dot: f32 = a.vector.iter().zip(&b.vector).map(|(x, y)| x * y).sum();
    let norm_a = a.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

pub fn compare_numeric(a: &NumericSketch, b: &NumericSketch, ks_threshold: f64) -> bool {
    !a.is_empty() && !b.is_empty() && ks_statistic(a, b) <= ks_threshold
}

pub fn compare_textual(a: &TextSketch, b: &TextSketch, cosine_threshold: f32) -> bool {
    !a.is_empty() && !b.is_empty() && cosine(a, b) >= cosine_threshold
}

/// Threshold-carrying comparator used by the graph builder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignatureComparator {
    pub ks_threshold: f64,
    pub cosine_threshold: f32,
}

impl SignatureComparator {
    pub fn new(config: &SimilarityConfig) -> Self {
        Self {
            ks_threshold: config.ks_threshold,
            cosine_threshold: config.cosine_threshold,
        }
    }

    /// Similarity score in [0, 1] when the two signatures are similar.
    ///
    /// `None` for kind mismatches, empty sketches and pairs below threshold.
    pub fn compare(&self, a: &Signature, b: &Signature) -> Option<f32> {
        match (a, b) {
            (Signature::Numeric(x), Signature::Numeric(y)) => {
                if compare_numeric(x, y, self.ks_threshold) {
                    Some((1.0 - ks_statistic(x, y)) as f32)
                } else {
                    None
                }
            }
            (Signature::Textual(x), Signature::Textual(y)) => {
                if compare_textual(x, y, self.cosine_threshold) {
                    Some(cosine(x, y).clamp(0.0, 1.0))
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&strings(&["1", "2.5", " -3 "])), ValueKind::Numeric);
        assert_eq!(classify(&strings(&["1", "two"])), ValueKind::Textual);
        assert_eq!(classify(&strings(&["1", "NaN"])), ValueKind::Textual);
        assert_eq!(classify::<String>(&[]), ValueKind::Numeric);
    }

    #[test]
    fn test_numeric_sketch_is_fixed_size() {
        let sketch = numeric_signature(&[5.0, 1.0, 3.0], 8);
        assert_eq!(sketch.quantiles.len(), 8);
        assert_eq!(sketch.count, 3);
        assert_eq!(sketch.quantiles[0], 1.0);
        assert_eq!(sketch.quantiles[7], 5.0);
    }

    #[test]
    fn test_empty_input_is_neutral() {
        let n = numeric_signature(&[], 16);
        assert!(n.is_empty());
        assert_eq!(n.quantiles.len(), 16);

        let t = textual_signature::<String>(&[], 16);
        assert!(t.is_empty());
        assert_eq!(t.vector.len(), 16);

        // neutral sketches are similar to nothing, not even themselves
        assert!(!compare_numeric(&n, &n, 1.0));
        assert!(!compare_textual(&t, &t, -1.0));
    }

    #[test]
    fn test_identical_distributions_have_zero_ks() {
        let values: Vec<f64> = (0..100).map(|v| v as f64).collect();
        let a = numeric_signature(&values, 32);
        let b = numeric_signature(&values, 32);
        assert_eq!(ks_statistic(&a, &b), 0.0);
        assert!(compare_numeric(&a, &b, 0.1));
    }

    #[test]
    fn test_disjoint_distributions_have_full_ks() {
        let low: Vec<f64> = (0..50).map(|v| v as f64).collect();
        let high: Vec<f64> = (1000..1050).map(|v| v as f64).collect();
        let a = numeric_signature(&low, 32);
        let b = numeric_signature(&high, 32);
        assert_eq!(ks_statistic(&a, &b), 1.0);
        assert!(!compare_numeric(&a, &b, 0.5));
    }

    #[test]
    fn test_textual_similarity() {
        let a = textual_signature(&strings(&["new york", "boston", "chicago"]), 64);
        let b = textual_signature(&strings(&["boston", "new york", "chicago"]), 64);
        let c = textual_signature(&strings(&["apple pie", "banana split"]), 64);
        assert!((cosine(&a, &b) - 1.0).abs() < 1e-5);
        assert!(cosine(&a, &c) < 0.6);
    }

    #[test]
    fn test_comparator_rejects_kind_mismatch() {
        let comparator = SignatureComparator::new(&SimilarityConfig::default());
        let n = Signature::compute(&strings(&["1", "2", "3"]), 16);
        let t = Signature::compute(&strings(&["a", "b", "c"]), 16);
        assert_eq!(n.kind(), ValueKind::Numeric);
        assert_eq!(t.kind(), ValueKind::Textual);
        assert_eq!(comparator.compare(&n, &t), None);
        assert_eq!(comparator.compare(&n, &n), Some(1.0));
    }

    proptest! {
        #[test]
        fn prop_signature_is_deterministic(values in proptest::collection::vec("[a-z0-9 .]{0,8}", 0..40), size in 1usize..64) {
            prop_assert_eq!(Signature::compute(&values, size), Signature::compute(&values, size));
        }

        #[test]
        fn prop_numeric_comparison_is_symmetric(
            a in proptest::collection::vec(-1e6f64..1e6, 0..60),
            b in proptest::collection::vec(-1e6f64..1e6, 0..60),
            threshold in 0.0f64..1.0,
        ) {
            let sa = numeric_signature(&a, 16);
            let sb = numeric_signature(&b, 16);
            prop_assert_eq!(ks_statistic(&sa, &sb), ks_statistic(&sb, &sa));
            prop_assert_eq!(compare_numeric(&sa, &sb, threshold), compare_numeric(&sb, &sa, threshold));
        }

        #[test]
        fn prop_textual_comparison_is_symmetric(
            a in proptest::collection::vec("[a-e]{1,4}", 0..30),
            b in proptest::collection::vec("[a-e]{1,4}", 0..30),
        ) {
            let sa = textual_signature(&a, 32);
            let sb = textual_signature(&b, 32);
            prop_assert_eq!(compare_textual(&sa, &sb, 0.5), compare_textual(&sb, &sa, 0.5));
        }
    }
}
