//! Sparse linear pipelines: TF-IDF features into a probabilistic linear model
//!
//! Artifacts are JSON exports of a fitted vectorizer and classifier. Inputs are
//! expected to be normalized text already; the dispatcher takes care of that.

use regex::Regex;
use sentiscope_core::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Serialized form of a fitted pipeline
#[derive(Debug, Deserialize)]
struct PipelineArtifact {
    vectorizer: VectorizerArtifact,
    classifier: ClassifierArtifact,
}

#[derive(Debug, Deserialize)]
struct VectorizerArtifact {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    #[serde(default = "default_ngram_range")]
    ngram_range: (usize, usize),
    #[serde(default)]
    sublinear_tf: bool,
    #[serde(default)]
    norm: Norm,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Norm {
    #[default]
    L2,
    L1,
    None,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClassifierArtifact {
    MultinomialNb {
        class_log_prior: [f64; 2],
        feature_log_prob: [Vec<f64>; 2],
    },
    LogisticRegression {
        coef: Vec<f64>,
        intercept: f64,
    },
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

/// TF-IDF vectorizer over word n-grams
pub struct TfidfVectorizer {
    token_pattern: Regex,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    ngram_range: (usize, usize),
    sublinear_tf: bool,
    norm: Norm,
}

impl TfidfVectorizer {
    /// Sparse feature vector as (index, value) pairs
    pub fn transform(&self, text: &str) -> Vec<(usize, f64)> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = self
            .token_pattern
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .collect();

        let mut counts: HashMap<usize, f64> = HashMap::new();
        let (min_n, max_n) = self.ngram_range;
        for n in min_n.max(1)..=max_n.min(tokens.len()) {
            for window in tokens.windows(n) {
                let term = window.join(" ");
                if let Some(&idx) = self.vocabulary.get(&term) {
                    *counts.entry(idx).or_insert(0.0) += 1.0;
                }
            }
        }

        let mut features: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, tf)| {
                let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (idx, tf * self.idf[idx])
            })
            .collect();
        features.sort_unstable_by_key(|(idx, _)| *idx);

        let denom = match self.norm {
            Norm::L2 => features.iter().map(|(_, v)| v * v).sum::<f64>().sqrt(),
            Norm::L1 => features.iter().map(|(_, v)| v.abs()).sum::<f64>(),
            Norm::None => 1.0,
        };
        if denom > 0.0 {
            for (_, value) in &mut features {
                *value /= denom;
            }
        }

        features
    }

    pub fn n_features(&self) -> usize {
        self.idf.len()
    }
}

/// Linear classifier producing two-class probabilities
pub enum LinearClassifier {
    MultinomialNb {
        class_log_prior: [f64; 2],
        feature_log_prob: [Vec<f64>; 2],
    },
    LogisticRegression {
        coef: Vec<f64>,
        intercept: f64,
    },
}

impl LinearClassifier {
    /// Class probabilities (negative, positive)
    pub fn predict_proba(&self, features: &[(usize, f64)]) -> [f64; 2] {
        match self {
            Self::MultinomialNb {
                class_log_prior,
                feature_log_prob,
            } => {
                let jll = [0, 1].map(|c| {
                    class_log_prior[c]
                        + features
                            .iter()
                            .map(|(idx, value)| value * feature_log_prob[c][*idx])
                            .sum::<f64>()
                });
                let max = jll[0].max(jll[1]);
                let exp = jll.map(|v| (v - max).exp());
                let total = exp[0] + exp[1];
                [exp[0] / total, exp[1] / total]
            }
            Self::LogisticRegression { coef, intercept } => {
                let z = intercept
                    + features
                        .iter()
                        .map(|(idx, value)| value * coef[*idx])
                        .sum::<f64>();
                let p = 1.0 / (1.0 + (-z).exp());
                [1.0 - p, p]
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MultinomialNb { .. } => "multinomial_nb",
            Self::LogisticRegression { .. } => "logistic_regression",
        }
    }
}

/// Fitted vectorizer + classifier
pub struct SparseLinearPipeline {
    vectorizer: TfidfVectorizer,
    classifier: LinearClassifier,
}

impl SparseLinearPipeline {
    /// Load and validate a pipeline artifact
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Parse and validate a pipeline from its JSON export
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: PipelineArtifact = serde_json::from_str(json)?;
        Self::from_artifact(artifact)
    }

    fn from_artifact(artifact: PipelineArtifact) -> Result<Self> {
        let VectorizerArtifact {
            vocabulary,
            idf,
            ngram_range,
            sublinear_tf,
            norm,
        } = artifact.vectorizer;
        let n_features = idf.len();

        if n_features == 0 {
            return Err(invalid("vectorizer has an empty idf vector"));
        }
        if ngram_range.0 == 0 || ngram_range.0 > ngram_range.1 {
            return Err(invalid(format!("invalid ngram_range {:?}", ngram_range)));
        }
        if let Some((term, idx)) = vocabulary.iter().find(|(_, idx)| **idx >= n_features) {
            return Err(invalid(format!(
                "vocabulary term '{}' maps to index {} but only {} features exist",
                term, idx, n_features
            )));
        }
        if idf.iter().any(|v| !v.is_finite()) {
            return Err(invalid("idf contains non-finite values"));
        }

        let classifier = match artifact.classifier {
            ClassifierArtifact::MultinomialNb {
                class_log_prior,
                feature_log_prob,
            } => {
                for row in &feature_log_prob {
                    if row.len() != n_features {
                        return Err(invalid(format!(
                            "feature_log_prob row has {} entries, expected {}",
                            row.len(),
                            n_features
                        )));
                    }
                }
                LinearClassifier::MultinomialNb {
                    class_log_prior,
                    feature_log_prob,
                }
            }
            ClassifierArtifact::LogisticRegression { coef, intercept } => {
                if coef.len() != n_features {
                    return Err(invalid(format!(
                        "coef has {} entries, expected {}",
                        coef.len(),
                        n_features
                    )));
                }
                LinearClassifier::LogisticRegression { coef, intercept }
            }
        };

        let token_pattern = Regex::new(r"\b\w\w+\b").map_err(|e| {
            sentiscope_core::Error::config(format!("Failed to compile token regex: {}", e))
        })?;

        Ok(Self {
            vectorizer: TfidfVectorizer {
                token_pattern,
                vocabulary,
                idf,
                ngram_range,
                sublinear_tf,
                norm,
            },
            classifier,
        })
    }

    /// Class probabilities (negative, positive) for already-normalized text
    pub fn predict_proba(&self, normalized: &str) -> [f64; 2] {
        let features = self.vectorizer.transform(normalized);
        self.classifier.predict_proba(&features)
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &LinearClassifier {
        &self.classifier
    }
}

fn invalid(msg: impl Into<String>) -> sentiscope_core::Error {
    sentiscope_core::Error::config(format!("invalid pipeline artifact: {}", msg.into()))
}
