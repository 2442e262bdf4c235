//! Artifact store layout and shared loading helpers for the neural backends

use crate::backend::BackendName;
use crate::config::DeviceSpec;
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use sentiscope_core::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

/// Filesystem location holding one optional bundle per backend
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file or directory whose presence decides stub vs load
    pub fn primary_path(&self, name: BackendName) -> PathBuf {
        match name {
            BackendName::NaiveBayes => self.root.join("naive_bayes_pipeline.json"),
            BackendName::LogisticRegression => self.root.join("logistic_regression_pipeline.json"),
            BackendName::RnnLstm => self.root.join("rnn_lstm.safetensors"),
            BackendName::DistilBert => self.root.join("distilbert"),
        }
    }

    /// Primary artifact path, or `ArtifactMissing`
    pub fn locate(&self, name: BackendName) -> Result<PathBuf> {
        let path = self.primary_path(name);
        if path.exists() {
            Ok(path)
        } else {
            Err(Error::ArtifactMissing(path))
        }
    }

    /// Auxiliary file next to a present primary; missing means a load failure
    pub fn auxiliary(&self, name: BackendName, file: &str) -> Result<PathBuf> {
        let path = self.root.join(file);
        if path.exists() {
            Ok(path)
        } else {
            Err(Error::artifact_load(
                name.as_str(),
                format!("auxiliary resource {} not found", path.display()),
            ))
        }
    }
}

/// Create a Candle device from the configured spec
pub fn create_device(spec: DeviceSpec) -> Result<Device> {
    match spec {
        DeviceSpec::Cpu => Ok(Device::Cpu),
        DeviceSpec::Cuda { index } => Device::new_cuda(index.unwrap_or(0))
            .map_err(|e| Error::config(format!("Failed to create CUDA device: {}", e))),
        DeviceSpec::Metal { index } => Device::new_metal(index.unwrap_or(0))
            .map_err(|e| Error::config(format!("Failed to create Metal device: {}", e))),
    }
}

/// Parse a JSON file belonging to a backend's bundle
pub fn read_json<T: DeserializeOwned>(name: BackendName, path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::artifact_load(
            name.as_str(),
            format!("failed to read {}: {}", path.display(), e),
        )
    })?;

    serde_json::from_str(&content).map_err(|e| {
        Error::artifact_load(
            name.as_str(),
            format!("failed to parse {}: {}", path.display(), e),
        )
    })
}

/// Read a safetensors file fully into memory
pub fn load_weights(
    name: BackendName,
    path: &Path,
    device: &Device,
) -> Result<VarBuilder<'static>> {
    let tensors = candle_core::safetensors::load(path, device).map_err(|e| {
        Error::artifact_load(
            name.as_str(),
            format!("failed to load weights {}: {}", path.display(), e),
        )
    })?;

    Ok(VarBuilder::from_tensors(tensors, DType::F32, device))
}

/// Memory-map `model.safetensors` from a model directory
pub fn mmap_weights(
    name: BackendName,
    model_dir: &Path,
    device: &Device,
) -> Result<VarBuilder<'static>> {
    let weights_path = model_dir.join("model.safetensors");
    if !weights_path.exists() {
        return Err(Error::artifact_load(
            name.as_str(),
            format!("model.safetensors not found in {}", model_dir.display()),
        ));
    }

    // SAFETY: artifacts are not modified while the process is running
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device).map_err(|e| {
            Error::artifact_load(name.as_str(), format!("failed to map weights: {}", e))
        })?
    };

    Ok(vb)
}

/// Load a subword tokenizer from `tokenizer.json`, or build one from `vocab.txt`
pub fn load_subword_tokenizer(name: BackendName, model_dir: &Path) -> Result<Tokenizer> {
    let tokenizer_json_path = model_dir.join("tokenizer.json");
    if tokenizer_json_path.exists() {
        tracing::debug!("Loading tokenizer from {}", tokenizer_json_path.display());
        return Tokenizer::from_file(&tokenizer_json_path).map_err(|e| {
            Error::artifact_load(name.as_str(), format!("failed to load tokenizer.json: {}", e))
        });
    }

    let vocab_path = model_dir.join("vocab.txt");
    if vocab_path.exists() {
        tracing::debug!("Building tokenizer from {}", vocab_path.display());

        use tokenizers::models::wordpiece::WordPiece;
        use tokenizers::normalizers::BertNormalizer;
        use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
        use tokenizers::processors::bert::BertProcessing;

        let wordpiece = WordPiece::from_file(vocab_path.to_string_lossy().as_ref())
            .unk_token("[UNK]".to_string())
            .build()
            .map_err(|e| {
                Error::artifact_load(
                    name.as_str(),
                    format!("failed to build WordPiece model: {}", e),
                )
            })?;

        let mut tokenizer = Tokenizer::new(wordpiece);
        tokenizer.with_normalizer(Some(BertNormalizer::default()));
        tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));

        let special_id = |token: &str| {
            tokenizer.token_to_id(token).ok_or_else(|| {
                Error::artifact_load(
                    name.as_str(),
                    format!("{} is missing {}", vocab_path.display(), token),
                )
            })
        };
        let sep = ("[SEP]".to_string(), special_id("[SEP]")?);
        let cls = ("[CLS]".to_string(), special_id("[CLS]")?);
        tokenizer.with_post_processor(Some(BertProcessing::new(sep, cls)));

        return Ok(tokenizer);
    }

    Err(Error::artifact_load(
        name.as_str(),
        format!(
            "no tokenizer found in {} (tried tokenizer.json, vocab.txt)",
            model_dir.display()
        ),
    ))
}

/// Fold any loader error into the registry's two outcomes
pub(crate) fn as_load_failure(name: BackendName, err: Error) -> Error {
    match err {
        Error::ArtifactMissing(_) | Error::ArtifactLoad { .. } => err,
        other => Error::artifact_load(name.as_str(), other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_paths() {
        let store = ArtifactStore::new("/srv/models");
        assert_eq!(
            store.primary_path(BackendName::NaiveBayes),
            PathBuf::from("/srv/models/naive_bayes_pipeline.json")
        );
        assert_eq!(
            store.primary_path(BackendName::DistilBert),
            PathBuf::from("/srv/models/distilbert")
        );
    }

    #[test]
    fn test_missing_primary_is_not_a_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store.locate(BackendName::RnnLstm).unwrap_err();
        assert!(matches!(err, Error::ArtifactMissing(_)));
    }

    #[test]
    fn test_missing_auxiliary_is_a_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store.auxiliary(BackendName::RnnLstm, "tokenizer.json").unwrap_err();
        assert!(matches!(err, Error::ArtifactLoad { ref backend, .. } if backend == "rnn_lstm"));
    }

    #[test]
    fn test_load_failure_wrapping() {
        let err = as_load_failure(BackendName::NaiveBayes, Error::config("bad dims"));
        assert_eq!(
            err.to_string(),
            "failed to load naive_bayes: configuration error: bad dims"
        );
    }

    #[test]
    fn test_tokenizer_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_subword_tokenizer(BackendName::DistilBert, dir.path()).is_err());
    }

    #[test]
    fn test_vocab_special_tokens_come_from_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("vocab.txt"),
            "[PAD]\n[UNK]\n[CLS]\n[SEP]\ngreat\nmovie\n",
        )
        .unwrap();

        let tokenizer = load_subword_tokenizer(BackendName::DistilBert, dir.path()).unwrap();
        let encoding = tokenizer.encode("Great movie", true).unwrap();
        assert_eq!(encoding.get_ids(), &[2, 4, 5, 3]);
    }

    #[test]
    fn test_vocab_without_special_tokens_is_a_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vocab.txt"), "[PAD]\n[UNK]\n[CLS]\ngreat\n").unwrap();

        let err = load_subword_tokenizer(BackendName::DistilBert, dir.path()).unwrap_err();
        match err {
            Error::ArtifactLoad { reason, .. } => assert!(reason.contains("[SEP]"), "{reason}"),
            other => panic!("expected load failure, got {other:?}"),
        }
    }

    #[test]
    fn test_cpu_device() {
        assert!(create_device(DeviceSpec::Cpu).unwrap().is_cpu());
    }
}
