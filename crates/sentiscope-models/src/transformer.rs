//! DistilBERT sequence-classification backend
//!
//! Consumes raw text. The model was fine-tuned without the normalizer, so the
//! subword tokenizer sees exactly what the caller sent.

use crate::artifacts::{self, ArtifactStore};
use crate::backend::BackendName;
use crate::config::TransformerConfig;
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use sentiscope_core::{Error, Result};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

pub struct TransformerBackend {
    tokenizer: Tokenizer,
    model: DistilBertModel,
    pre_classifier: Option<Linear>,
    classifier: Linear,
    device: Device,
}

impl TransformerBackend {
    /// Load from the `distilbert/` model directory
    pub fn load(
        store: &ArtifactStore,
        config: &TransformerConfig,
        device: &Device,
    ) -> Result<Self> {
        let name = BackendName::DistilBert;
        let model_dir = store.locate(name)?;

        let mut tokenizer = artifacts::load_subword_tokenizer(name, &model_dir)?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_length,
                ..Default::default()
            }))
            .map_err(|e| {
                let reason = format!("failed to configure truncation: {}", e);
                Error::artifact_load(name.as_str(), reason)
            })?;
        tokenizer.with_padding(None);

        let config_path = model_dir.join("config.json");
        let config_json: serde_json::Value = artifacts::read_json(name, &config_path)?;
        let hidden_size = config_json
            .get("dim")
            .or_else(|| config_json.get("hidden_size"))
            .and_then(|v| v.as_u64())
            .unwrap_or(768) as usize;
        let distilbert_config: DistilBertConfig = artifacts::read_json(name, &config_path)?;

        let vb = artifacts::mmap_weights(name, &model_dir, device)?;

        let model = DistilBertModel::load(vb.pp("distilbert"), &distilbert_config).map_err(|e| {
            Error::artifact_load(name.as_str(), format!("failed to build DistilBERT: {}", e))
        })?;

        // optional layer: absent is fine, present but malformed is not
        let pre_classifier = if vb.contains_tensor("pre_classifier.weight") {
            let layer = candle_nn::linear(hidden_size, hidden_size, vb.pp("pre_classifier"))
                .map_err(|e| {
                    Error::artifact_load(name.as_str(), format!("invalid pre_classifier: {}", e))
                })?;
            debug!("Loaded pre_classifier layer (hidden_size={})", hidden_size);
            Some(layer)
        } else {
            None
        };

        let classifier = candle_nn::linear(hidden_size, 2, vb.pp("classifier")).map_err(|e| {
            Error::artifact_load(name.as_str(), format!("classification head missing: {}", e))
        })?;

        Ok(Self {
            tokenizer,
            model,
            pre_classifier,
            classifier,
            device: device.clone(),
        })
    }

    /// Class probabilities (negative, positive) for raw text
    pub fn predict_proba(&self, text: &str) -> Result<[f64; 2]> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::inference(format!("Tokenization failed: {}", e)))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&x| x as i64).collect();
        // DistilBERT masks positions flagged with 1
        let inverted_mask: Vec<u8> = encoding
            .get_attention_mask()
            .iter()
            .map(|&x| if x == 0 { 1u8 } else { 0u8 })
            .collect();

        let probs = self
            .forward(&input_ids, &inverted_mask)
            .map_err(|e| Error::inference(format!("Transformer forward pass failed: {}", e)))?;

        match probs.as_slice() {
            [neg, pos] => Ok([*neg, *pos]),
            other => Err(Error::inference(format!(
                "expected 2 class probabilities, got {}",
                other.len()
            ))),
        }
    }

    fn forward(&self, input_ids: &[i64], inverted_mask: &[u8]) -> candle_core::Result<Vec<f64>> {
        let input_ids = Tensor::new(input_ids, &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(inverted_mask, &self.device)?.unsqueeze(0)?;

        let hidden_states = self.model.forward(&input_ids, &attention_mask)?;
        let cls_embedding = hidden_states.i((0, 0, ..))?.unsqueeze(0)?;

        let pooled = match &self.pre_classifier {
            Some(pre_classifier) => pre_classifier.forward(&cls_embedding)?.relu()?,
            None => cls_embedding,
        };

        let logits = self.classifier.forward(&pooled)?;
        candle_nn::ops::softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_dtype(DType::F64)?
            .to_vec1::<f64>()
    }
}
