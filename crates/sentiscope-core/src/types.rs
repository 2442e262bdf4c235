//! Core types for Sentiscope

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary sentiment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Positive,
}

impl Sentiment {
    /// Label for a class index (0 = negative, 1 = positive)
    pub fn from_class(idx: usize) -> Self {
        if idx == 1 {
            Self::Positive
        } else {
            Self::Negative
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negative => "negative",
            Self::Positive => "positive",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized output of any backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Winning label
    #[serde(rename = "sentiment")]
    pub label: Sentiment,

    /// Probability mass of the winning label, rounded to 4 decimals
    pub confidence: f64,
}

impl PredictionResult {
    /// Create a result, rounding confidence for response stability
    pub fn new(label: Sentiment, confidence: f64) -> Self {
        Self {
            label,
            confidence: round_to(confidence, 4),
        }
    }

    /// Build from a two-class probability vector (negative, positive)
    pub fn from_probabilities(probs: [f64; 2]) -> Self {
        // ties go to the first class, matching arg-max semantics
        let idx = if probs[1] > probs[0] { 1 } else { 0 };
        Self::new(Sentiment::from_class(idx), probs[idx])
    }
}

/// One word of an importance explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationItem {
    /// Normalized token
    pub word: String,

    /// Signed importance; positive pushes toward "positive"
    pub weight: f64,
}

impl ExplanationItem {
    pub fn new(word: impl Into<String>, weight: f64) -> Self {
        Self {
            word: word.into(),
            weight,
        }
    }
}

/// Round to a fixed number of decimal digits
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
