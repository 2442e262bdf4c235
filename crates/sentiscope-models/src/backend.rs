//! Backend identity: names, kinds and the loaded-handle slot

use crate::sequence::SequenceBackend;
use crate::sparse_linear::SparseLinearPipeline;
use crate::transformer::TransformerBackend;
use sentiscope_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four public backend names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BackendName {
    #[serde(rename = "naive_bayes")]
    NaiveBayes,
    #[serde(rename = "logistic_regression")]
    LogisticRegression,
    #[serde(rename = "rnn_lstm")]
    RnnLstm,
    #[serde(rename = "distilbert")]
    DistilBert,
}

impl BackendName {
    /// Every backend, in response order
    pub const ALL: [BackendName; 4] = [
        BackendName::NaiveBayes,
        BackendName::LogisticRegression,
        BackendName::RnnLstm,
        BackendName::DistilBert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NaiveBayes => "naive_bayes",
            Self::LogisticRegression => "logistic_regression",
            Self::RnnLstm => "rnn_lstm",
            Self::DistilBert => "distilbert",
        }
    }

    /// Kind this backend has when its artifact is loaded
    pub fn trained_kind(&self) -> BackendKind {
        match self {
            Self::NaiveBayes => BackendKind::SparseLinearA,
            Self::LogisticRegression => BackendKind::SparseLinearB,
            Self::RnnLstm => BackendKind::SequenceModel,
            Self::DistilBert => BackendKind::Transformer,
        }
    }

    /// Per-backend offset mixed into the stub noise seed
    pub fn stub_seed_offset(&self) -> u64 {
        match self {
            Self::NaiveBayes => 0,
            Self::LogisticRegression => 10,
            Self::RnnLstm => 20,
            Self::DistilBert => 30,
        }
    }
}

impl fmt::Display for BackendName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownBackendName(s.to_string()))
    }
}

/// Closed set of backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    SparseLinearA,
    SparseLinearB,
    SequenceModel,
    Transformer,
    HeuristicStub,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SparseLinearA => "sparse_linear_a",
            Self::SparseLinearB => "sparse_linear_b",
            Self::SequenceModel => "sequence_model",
            Self::Transformer => "transformer",
            Self::HeuristicStub => "heuristic_stub",
        }
    }

    /// Whether this kind consumes normalized text
    pub fn uses_normalized_text(&self) -> bool {
        matches!(self, Self::SparseLinearA | Self::SparseLinearB)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BackendKind {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sparse_linear_a" => Ok(Self::SparseLinearA),
            "sparse_linear_b" => Ok(Self::SparseLinearB),
            "sequence_model" => Ok(Self::SequenceModel),
            "transformer" => Ok(Self::Transformer),
            "heuristic_stub" => Ok(Self::HeuristicStub),
            other => Err(Error::UnknownBackendKind(other.to_string())),
        }
    }
}

/// A loaded model handle, or nothing for the stub.
///
/// The kind is derived from the variant, so a slot can never claim a kind
/// whose handle it does not hold.
pub enum Backend {
    SparseLinearA(SparseLinearPipeline),
    SparseLinearB(SparseLinearPipeline),
    SequenceModel(SequenceBackend),
    Transformer(Box<TransformerBackend>),
    HeuristicStub,
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::SparseLinearA(_) => BackendKind::SparseLinearA,
            Self::SparseLinearB(_) => BackendKind::SparseLinearB,
            Self::SequenceModel(_) => BackendKind::SequenceModel,
            Self::Transformer(_) => BackendKind::Transformer,
            Self::HeuristicStub => BackendKind::HeuristicStub,
        }
    }
}

/// How a slot came to hold its backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum LoadStatus {
    /// Trained artifact loaded
    Loaded,
    /// No artifact present
    Stub,
    /// Artifact present but unusable
    Failed(String),
}

/// One registry entry
pub struct BackendSlot {
    name: BackendName,
    backend: Backend,
    status: LoadStatus,
}

impl BackendSlot {
    /// Slot holding a trained backend
    pub fn loaded(name: BackendName, backend: Backend) -> Self {
        Self {
            name,
            backend,
            status: LoadStatus::Loaded,
        }
    }

    /// Slot holding the heuristic stub
    pub fn stub(name: BackendName, status: LoadStatus) -> Self {
        Self {
            name,
            backend: Backend::HeuristicStub,
            status,
        }
    }

    pub fn name(&self) -> BackendName {
        self.name
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn is_stub(&self) -> bool {
        matches!(self.backend, Backend::HeuristicStub)
    }
}

impl fmt::Debug for BackendSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSlot")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("status", &self.status)
            .finish()
    }
}
