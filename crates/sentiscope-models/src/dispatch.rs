//! Inference dispatch: one prediction contract over every backend kind

use crate::backend::{Backend, BackendName, BackendSlot};
use crate::lexicon::SentimentLexicon;
use crate::normalizer::Normalizer;
use crate::registry::ModelRegistry;
use crate::seed;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sentiscope_core::{Error, PredictionResult, Result, Sentiment};

/// Characters of raw text hashed into the stub noise seed
const STUB_PREFIX_CHARS: usize = 30;

const STUB_NOISE: f64 = 0.05;
const STUB_MIN_CONFIDENCE: f64 = 0.51;
const STUB_MAX_CONFIDENCE: f64 = 0.97;

/// Runs predictions against registry slots
#[derive(Clone, Copy)]
pub struct Dispatcher<'a> {
    normalizer: &'a Normalizer,
}

impl<'a> Dispatcher<'a> {
    pub fn new(normalizer: &'a Normalizer) -> Self {
        Self { normalizer }
    }

    pub fn from_registry(registry: &'a ModelRegistry) -> Self {
        Self::new(registry.normalizer())
    }

    pub fn normalizer(&self) -> &'a Normalizer {
        self.normalizer
    }

    /// Label and confidence for one text
    pub fn predict(&self, slot: &BackendSlot, text: &str) -> Result<PredictionResult> {
        check_slot(slot)?;

        match slot.backend() {
            Backend::HeuristicStub => Ok(self.stub_predict(slot.name(), text)),
            Backend::SparseLinearA(pipeline) | Backend::SparseLinearB(pipeline) => {
                let probs = pipeline.predict_proba(&self.normalizer.normalize(text));
                Ok(PredictionResult::from_probabilities(finite(probs)?))
            }
            Backend::SequenceModel(model) => {
                let score = model.score(&self.normalizer.normalize(text))?;
                if !score.is_finite() {
                    return Err(Error::inference("sequence model produced a non-finite score"));
                }
                Ok(if score > 0.5 {
                    PredictionResult::new(Sentiment::Positive, score)
                } else {
                    PredictionResult::new(Sentiment::Negative, 1.0 - score)
                })
            }
            Backend::Transformer(model) => {
                let probs = model.predict_proba(text)?;
                Ok(PredictionResult::from_probabilities(finite(probs)?))
            }
        }
    }

    /// Class probabilities (negative, positive) for a batch of texts.
    ///
    /// Only backends with a probability function support this; the stub does not.
    pub fn predict_proba<S: AsRef<str>>(
        &self,
        slot: &BackendSlot,
        texts: &[S],
    ) -> Result<Vec<[f64; 2]>> {
        check_slot(slot)?;

        match slot.backend() {
            Backend::SparseLinearA(pipeline) | Backend::SparseLinearB(pipeline) => Ok(texts
                .iter()
                .map(|text| pipeline.predict_proba(&self.normalizer.normalize(text.as_ref())))
                .collect()),
            Backend::SequenceModel(model) => texts
                .iter()
                .map(|text| {
                    model
                        .score(&self.normalizer.normalize(text.as_ref()))
                        .map(|p| [1.0 - p, p])
                })
                .collect(),
            Backend::Transformer(model) => texts
                .iter()
                .map(|text| model.predict_proba(text.as_ref()))
                .collect(),
            Backend::HeuristicStub => Err(Error::inference(format!(
                "{} is a heuristic stub and has no probability function",
                slot.name()
            ))),
        }
    }

    /// Deterministic lexicon-count prediction used when no artifact is loaded
    pub fn stub_predict(&self, name: BackendName, text: &str) -> PredictionResult {
        let tokens = self.normalizer.tokens(text);
        let counts = SentimentLexicon::shared().count(tokens.iter().map(String::as_str));

        let seed = seed::prefix_seed(text, STUB_PREFIX_CHARS) + name.stub_seed_offset();
        let mut rng = StdRng::seed_from_u64(seed);
        let noise: f64 = rng.gen_range(-STUB_NOISE..STUB_NOISE);

        let raw = counts.score() + noise;
        let confidence =
            (raw.abs() * 0.4 + 0.5 + noise).clamp(STUB_MIN_CONFIDENCE, STUB_MAX_CONFIDENCE);
        let label = if raw >= 0.0 {
            Sentiment::Positive
        } else {
            Sentiment::Negative
        };

        PredictionResult::new(label, confidence)
    }
}

/// A trained slot must hold the kind its name was trained as
fn check_slot(slot: &BackendSlot) -> Result<()> {
    if !slot.is_stub() && slot.kind() != slot.name().trained_kind() {
        return Err(Error::UnknownBackendKind(format!(
            "{} in slot {}",
            slot.kind(),
            slot.name()
        )));
    }
    Ok(())
}

fn finite(probs: [f64; 2]) -> Result<[f64; 2]> {
    if probs.iter().all(|p| p.is_finite()) {
        Ok(probs)
    } else {
        Err(Error::inference(format!("non-finite class probabilities {:?}", probs)))
    }
}
