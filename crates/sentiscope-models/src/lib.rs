//! Sentiscope Models
//!
//! Model registry, inference dispatch and word-importance explanations for
//! four sentiment backends:
//! - `naive_bayes`, `logistic_regression`: TF-IDF sparse linear pipelines
//! - `rnn_lstm`: embedding + stacked BiLSTM over a word-index vocabulary
//! - `distilbert`: fine-tuned DistilBERT over raw text
//!
//! A backend whose artifact is missing or unusable is served by a
//! deterministic lexicon stub, so every name always answers.

pub mod artifacts;
pub mod backend;
pub mod config;
pub mod dispatch;
pub mod explain;
pub mod lemmatizer;
pub mod lexicon;
pub mod normalizer;
pub mod registry;
pub mod seed;
pub mod sequence;
pub mod sparse_linear;
pub mod stopwords;
pub mod transformer;

pub use artifacts::ArtifactStore;
pub use backend::{Backend, BackendKind, BackendName, BackendSlot, LoadStatus};
pub use config::{DeviceSpec, ExplanationConfig, ModelsConfig, SequenceConfig, TransformerConfig};
pub use dispatch::Dispatcher;
pub use explain::{Explainer, Explanation, ExplanationStrategy};
pub use normalizer::{Normalizer, NormalizerMode};
pub use registry::{ModelRegistry, SharedRegistry, SlotStatus};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backend::{BackendKind, BackendName, BackendSlot};
    pub use crate::dispatch::Dispatcher;
    pub use crate::explain::Explainer;
    pub use crate::registry::{ModelRegistry, SharedRegistry};
    pub use sentiscope_core::{ExplanationItem, PredictionResult, Sentiment};
}
