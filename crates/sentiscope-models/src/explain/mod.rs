//! Explanation engine
//!
//! Sparse-linear slots get a perturbation explanation; everything else, and
//! any perturbation failure, gets the lexicon heuristic. `explain` never
//! returns an error.

pub mod heuristic;
pub mod perturbation;
pub mod surrogate;

use crate::backend::{BackendKind, BackendSlot};
use crate::config::ExplanationConfig;
use crate::dispatch::Dispatcher;
use crate::registry::ModelRegistry;
use crate::seed;
use perturbation::PerturbationExplainer;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sentiscope_core::{ExplanationItem, Result};
use serde::Serialize;
use tracing::warn;

/// How an explanation was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationStrategy {
    Perturbation,
    Lexicon,
}

/// Explanation plus how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub items: Vec<ExplanationItem>,
    pub strategy: ExplanationStrategy,
    /// Why the perturbation explainer was abandoned, if it was
    pub fallback_reason: Option<String>,
}

pub struct Explainer<'a> {
    dispatcher: Dispatcher<'a>,
    config: &'a ExplanationConfig,
}

impl<'a> Explainer<'a> {
    pub fn new(dispatcher: Dispatcher<'a>, config: &'a ExplanationConfig) -> Self {
        Self { dispatcher, config }
    }

    pub fn from_registry(registry: &'a ModelRegistry) -> Self {
        Self::new(
            Dispatcher::from_registry(registry),
            &registry.config().explanation,
        )
    }

    /// Strategy a slot gets before any failure
    pub fn strategy_for(slot: &BackendSlot) -> ExplanationStrategy {
        match slot.kind() {
            BackendKind::SparseLinearA | BackendKind::SparseLinearB => {
                ExplanationStrategy::Perturbation
            }
            BackendKind::SequenceModel | BackendKind::Transformer | BackendKind::HeuristicStub => {
                ExplanationStrategy::Lexicon
            }
        }
    }

    /// Ordered word weights, at most `num_features`, no duplicates
    pub fn explain(
        &self,
        slot: &BackendSlot,
        text: &str,
        num_features: usize,
    ) -> Vec<ExplanationItem> {
        self.explain_detailed(slot, text, num_features).items
    }

    pub fn explain_detailed(
        &self,
        slot: &BackendSlot,
        text: &str,
        num_features: usize,
    ) -> Explanation {
        match Self::strategy_for(slot) {
            ExplanationStrategy::Perturbation => match self.perturbation(slot, text, num_features) {
                Ok(items) => Explanation {
                    items,
                    strategy: ExplanationStrategy::Perturbation,
                    fallback_reason: None,
                },
                Err(e) => {
                    warn!(
                        "Perturbation explanation for {} failed ({}), using lexicon heuristic",
                        slot.name(),
                        e
                    );
                    Explanation {
                        items: self.lexicon(slot, text, num_features),
                        strategy: ExplanationStrategy::Lexicon,
                        fallback_reason: Some(e.to_string()),
                    }
                }
            },
            ExplanationStrategy::Lexicon => Explanation {
                items: self.lexicon(slot, text, num_features),
                strategy: ExplanationStrategy::Lexicon,
                fallback_reason: None,
            },
        }
    }

    fn perturbation(
        &self,
        slot: &BackendSlot,
        text: &str,
        num_features: usize,
    ) -> Result<Vec<ExplanationItem>> {
        let explainer = PerturbationExplainer::new(self.config)?;
        explainer.explain(text, num_features, |texts| {
            Ok(self
                .dispatcher
                .predict_proba(slot, texts)?
                .into_iter()
                .map(|[_, positive]| positive)
                .collect())
        })
    }

    fn lexicon(
        &self,
        slot: &BackendSlot,
        text: &str,
        num_features: usize,
    ) -> Vec<ExplanationItem> {
        let mut rng = if self.config.deterministic_heuristic {
            StdRng::seed_from_u64(seed::stable_hash(&[slot.name().as_str(), text]))
        } else {
            StdRng::from_entropy()
        };
        heuristic::lexicon_explanation(text, num_features, &mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, BackendName, LoadStatus};
    use crate::normalizer::Normalizer;
    use crate::sparse_linear::SparseLinearPipeline;

    const PIPELINE: &str = r#"{
        "vectorizer": {"vocabulary": {"great": 0, "boring": 1, "plot": 2}, "idf": [1.0, 1.0, 1.0]},
        "classifier": {"type": "logistic_regression", "coef": [3.0, -3.0, 0.0], "intercept": 0.0}
    }"#;

    fn config() -> ExplanationConfig {
        ExplanationConfig {
            num_samples: 300,
            seed: Some(11),
            ..ExplanationConfig::default()
        }
    }

    fn trained_slot() -> BackendSlot {
        BackendSlot::loaded(
            BackendName::NaiveBayes,
            Backend::SparseLinearA(SparseLinearPipeline::from_json(PIPELINE).unwrap()),
        )
    }

    #[test]
    fn test_stub_uses_lexicon() {
        let normalizer = Normalizer::default();
        let config = config();
        let explainer = Explainer::new(Dispatcher::new(&normalizer), &config);
        let slot = BackendSlot::stub(BackendName::DistilBert, LoadStatus::Stub);

        let text = "Great acting, excellent score, amazing visuals, wonderful cast, \
                    but a terrible, boring, awful and dull script.";
        let explanation = explainer.explain_detailed(&slot, text, 5);
        assert_eq!(explanation.strategy, ExplanationStrategy::Lexicon);
        assert_eq!(explanation.items.len(), 5);
        for pair in explanation.items.windows(2) {
            assert!(pair[0].weight.abs() >= pair[1].weight.abs());
        }
    }

    #[test]
    fn test_sparse_linear_uses_perturbation() {
        let normalizer = Normalizer::default();
        let config = config();
        let explainer = Explainer::new(Dispatcher::new(&normalizer), &config);

        let explanation =
            explainer.explain_detailed(&trained_slot(), "A great plot with a boring finale", 3);
        assert_eq!(explanation.strategy, ExplanationStrategy::Perturbation);
        assert!(explanation.fallback_reason.is_none());
        assert_eq!(explanation.items.len(), 3);

        let weight = |w: &str| explanation.items.iter().find(|i| i.word == w).map(|i| i.weight);
        assert!(weight("great").unwrap() > 0.0);
        assert!(weight("boring").unwrap() < 0.0);
    }

    #[test]
    fn test_empty_text_falls_back() {
        let normalizer = Normalizer::default();
        let config = config();
        let explainer = Explainer::new(Dispatcher::new(&normalizer), &config);

        let explanation = explainer.explain_detailed(&trained_slot(), "", 5);
        assert_eq!(explanation.strategy, ExplanationStrategy::Lexicon);
        assert!(explanation.fallback_reason.is_some());
        assert!(explanation.items.is_empty());
    }

    #[test]
    fn test_deterministic_heuristic() {
        let normalizer = Normalizer::default();
        let config = ExplanationConfig {
            deterministic_heuristic: true,
            ..ExplanationConfig::default()
        };
        let explainer = Explainer::new(Dispatcher::new(&normalizer), &config);
        let slot = BackendSlot::stub(BackendName::RnnLstm, LoadStatus::Stub);

        let text = "loved the brilliant cast, hated the awful ending";
        assert_eq!(explainer.explain(&slot, text, 4), explainer.explain(&slot, text, 4));
    }
}
