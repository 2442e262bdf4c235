//! Error types for Sentiscope

use std::path::PathBuf;

/// Result type alias using Sentiscope's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Sentiscope operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A backend's artifact is not present in the artifact store.
    ///
    /// This is an expected deployment state and resolves to a heuristic stub.
    #[error("artifact not found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    /// A backend's artifact is present but could not be loaded
    #[error("failed to load {backend}: {reason}")]
    ArtifactLoad { backend: String, reason: String },

    /// Caller asked for a backend name outside the fixed set
    #[error("unknown backend '{0}'")]
    UnknownBackendName(String),

    /// Backend kind tag outside the closed set (registry invariant violation)
    #[error("unknown backend kind '{0}'")]
    UnknownBackendKind(String),

    /// Failure while producing a perturbation explanation
    #[error("explanation error: {0}")]
    Explanation(String),

    /// Failure inside a loaded backend's forward pass
    #[error("inference error: {0}")]
    Inference(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new artifact load error
    pub fn artifact_load(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ArtifactLoad {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Create a new explanation error
    pub fn explanation(msg: impl Into<String>) -> Self {
        Self::Explanation(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error was caused by the caller rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnknownBackendName(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::artifact_load("naive_bayes", "bad json");
        assert_eq!(err.to_string(), "failed to load naive_bayes: bad json");

        let err = Error::UnknownBackendName("svm".to_string());
        assert_eq!(err.to_string(), "unknown backend 'svm'");

        let err = Error::ArtifactMissing(PathBuf::from("/tmp/x.json"));
        assert_eq!(err.to_string(), "artifact not found: /tmp/x.json");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::UnknownBackendName("x".into()).is_client_error());
        assert!(!Error::UnknownBackendKind("x".into()).is_client_error());
        assert!(!Error::inference("boom").is_client_error());
    }
}
