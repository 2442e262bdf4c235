//! Recurrent sequence backend: word-index tokenizer plus a stacked BiLSTM
//!
//! Layout: Embedding -> BiLSTM (full sequence) -> BiLSTM (last state) ->
//! Dense + relu -> Dense(1) + sigmoid. The backward direction of each
//! bidirectional layer runs the same LSTM cell over the time-reversed input.

use crate::artifacts::{self, ArtifactStore};
use crate::backend::BackendName;
use crate::config::SequenceConfig;
use candle_core::{DType, Device, Tensor, D};
use candle_nn::rnn::{Direction, LSTMConfig, LSTM, RNN};
use candle_nn::{Embedding, Linear, Module, VarBuilder};
use sentiscope_core::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Layer sizes stored next to the weights
#[derive(Debug, Clone, Deserialize)]
pub struct SequenceModelConfig {
    #[serde(default = "default_vocab_size")]
    pub vocab_size: usize,
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
    #[serde(default = "default_lstm1_units")]
    pub lstm1_units: usize,
    #[serde(default = "default_lstm2_units")]
    pub lstm2_units: usize,
    #[serde(default = "default_dense_units")]
    pub dense_units: usize,
}

fn default_vocab_size() -> usize {
    10_000
}

fn default_embedding_dim() -> usize {
    32
}

fn default_lstm1_units() -> usize {
    64
}

fn default_lstm2_units() -> usize {
    32
}

fn default_dense_units() -> usize {
    64
}

impl Default for SequenceModelConfig {
    fn default() -> Self {
        Self {
            vocab_size: default_vocab_size(),
            embedding_dim: default_embedding_dim(),
            lstm1_units: default_lstm1_units(),
            lstm2_units: default_lstm2_units(),
            dense_units: default_dense_units(),
        }
    }
}

/// Word-index vocabulary mapping fit alongside the sequence model
#[derive(Debug, Clone, Deserialize)]
pub struct WordIndexTokenizer {
    word_index: HashMap<String, u32>,
    #[serde(default)]
    num_words: Option<usize>,
    #[serde(default)]
    oov_token: Option<String>,
}

impl WordIndexTokenizer {
    pub fn new(
        word_index: HashMap<String, u32>,
        num_words: Option<usize>,
        oov_token: Option<String>,
    ) -> Self {
        Self {
            word_index,
            num_words,
            oov_token,
        }
    }

    fn oov_index(&self) -> Option<u32> {
        self.oov_token
            .as_ref()
            .and_then(|token| self.word_index.get(token).copied())
    }

    /// Integer sequence for whitespace-separated text, before padding
    pub fn texts_to_sequence(&self, text: &str) -> Vec<u32> {
        let oov = self.oov_index();
        let mut sequence = Vec::new();

        for word in text.split_whitespace() {
            match self.word_index.get(word) {
                Some(&idx) if self.num_words.is_some_and(|n| idx as usize >= n) => {
                    sequence.extend(oov);
                }
                Some(&idx) => sequence.push(idx),
                None if self.oov_token.is_some() => sequence.extend(oov),
                None => {}
            }
        }

        sequence
    }

    /// Fixed-length sequence: truncated and zero-padded at the tail
    pub fn encode(&self, text: &str, max_length: usize) -> Vec<u32> {
        let mut sequence = self.texts_to_sequence(text);
        sequence.truncate(max_length);
        sequence.resize(max_length, 0);
        sequence
    }
}

/// Two LSTMs over opposite time directions
struct BiLstm {
    forward: LSTM,
    backward: LSTM,
}

impl BiLstm {
    fn load(in_dim: usize, hidden: usize, vb: VarBuilder) -> candle_core::Result<Self> {
        let forward = candle_nn::lstm(in_dim, hidden, LSTMConfig::default(), vb.clone())?;
        let backward = candle_nn::lstm(
            in_dim,
            hidden,
            LSTMConfig {
                direction: Direction::Backward,
                ..LSTMConfig::default()
            },
            vb,
        )?;
        Ok(Self { forward, backward })
    }

    /// (batch, seq, in) -> (batch, seq, 2 * hidden)
    fn forward_sequence(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let fwd_states = self.forward.seq(xs)?;
        let fwd = self.forward.states_to_tensor(&fwd_states)?;

        let reversed = reverse_time(xs)?;
        let bwd_states = self.backward.seq(&reversed)?;
        let bwd = reverse_time(&self.backward.states_to_tensor(&bwd_states)?)?;

        Tensor::cat(&[&fwd, &bwd], D::Minus1)
    }

    /// (batch, seq, in) -> (batch, 2 * hidden), final state of each direction
    fn forward_last(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let fwd_states = self.forward.seq(xs)?;
        let bwd_states = self.backward.seq(&reverse_time(xs)?)?;

        match (fwd_states.last(), bwd_states.last()) {
            (Some(fwd), Some(bwd)) => Tensor::cat(&[fwd.h(), bwd.h()], D::Minus1),
            _ => candle_core::bail!("empty input sequence"),
        }
    }
}

fn reverse_time(xs: &Tensor) -> candle_core::Result<Tensor> {
    let len = xs.dim(1)?;
    let indices: Vec<u32> = (0..len as u32).rev().collect();
    let indices = Tensor::new(indices.as_slice(), xs.device())?;
    xs.index_select(&indices, 1)
}

/// Loaded sequence model with its paired tokenizer
pub struct SequenceBackend {
    tokenizer: WordIndexTokenizer,
    embedding: Embedding,
    lstm1: BiLstm,
    lstm2: BiLstm,
    dense: Linear,
    output: Linear,
    device: Device,
    max_length: usize,
}

impl SequenceBackend {
    /// Load from `rnn_lstm.safetensors`, `rnn_lstm.json` and `tokenizer.json`
    pub fn load(store: &ArtifactStore, config: &SequenceConfig, device: &Device) -> Result<Self> {
        let name = BackendName::RnnLstm;
        let weights_path = store.locate(name)?;
        let model_config: SequenceModelConfig =
            artifacts::read_json(name, &store.auxiliary(name, "rnn_lstm.json")?)?;
        let tokenizer: WordIndexTokenizer =
            artifacts::read_json(name, &store.auxiliary(name, "tokenizer.json")?)?;

        let vb = artifacts::load_weights(name, &weights_path, device)?;
        Self::from_var_builder(tokenizer, &model_config, vb, device.clone(), config.max_length)
            .map_err(|e| Error::artifact_load(name.as_str(), e.to_string()))
    }

    fn from_var_builder(
        tokenizer: WordIndexTokenizer,
        cfg: &SequenceModelConfig,
        vb: VarBuilder,
        device: Device,
        max_length: usize,
    ) -> candle_core::Result<Self> {
        let embedding =
            candle_nn::embedding(cfg.vocab_size, cfg.embedding_dim, vb.pp("embedding"))?;
        let lstm1 = BiLstm::load(cfg.embedding_dim, cfg.lstm1_units, vb.pp("lstm1"))?;
        let lstm2 = BiLstm::load(2 * cfg.lstm1_units, cfg.lstm2_units, vb.pp("lstm2"))?;
        let dense = candle_nn::linear(2 * cfg.lstm2_units, cfg.dense_units, vb.pp("dense"))?;
        let output = candle_nn::linear(cfg.dense_units, 1, vb.pp("output"))?;

        Ok(Self {
            tokenizer,
            embedding,
            lstm1,
            lstm2,
            dense,
            output,
            device,
            max_length: max_length.max(1),
        })
    }

    pub fn tokenizer(&self) -> &WordIndexTokenizer {
        &self.tokenizer
    }

    /// Sigmoid score in [0, 1] for already-normalized text
    pub fn score(&self, normalized: &str) -> Result<f64> {
        let ids = self.tokenizer.encode(normalized, self.max_length);
        self.forward(&ids)
            .map_err(|e| Error::inference(format!("Sequence model forward pass failed: {}", e)))
    }

    fn forward(&self, ids: &[u32]) -> candle_core::Result<f64> {
        let input = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let embedded = self.embedding.forward(&input)?;
        let hidden = self.lstm1.forward_sequence(&embedded)?;
        let last = self.lstm2.forward_last(&hidden)?;
        let dense = self.dense.forward(&last)?.relu()?;
        let logit = self
            .output
            .forward(&dense)?
            .to_dtype(DType::F64)?
            .flatten_all()?
            .to_vec1::<f64>()?;

        match logit.first() {
            Some(z) => Ok(1.0 / (1.0 + (-z).exp())),
            None => candle_core::bail!("output layer produced no values"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> WordIndexTokenizer {
        let word_index = [("<OOV>", 1), ("movie", 2), ("great", 3), ("plot", 4), ("rare", 12)]
            .into_iter()
            .map(|(w, i)| (w.to_string(), i))
            .collect();
        WordIndexTokenizer::new(word_index, Some(10), Some("<OOV>".to_string()))
    }

    #[test]
    fn test_known_and_unknown_words() {
        let tok = tokenizer();
        assert_eq!(tok.texts_to_sequence("great movie zzz"), vec![3, 2, 1]);
    }

    #[test]
    fn test_index_beyond_num_words_maps_to_oov() {
        let tok = tokenizer();
        assert_eq!(tok.texts_to_sequence("rare plot"), vec![1, 4]);
    }

    #[test]
    fn test_without_oov_token_unknown_words_skipped() {
        let word_index = [("movie".to_string(), 1)].into_iter().collect();
        let tok = WordIndexTokenizer::new(word_index, None, None);
        assert_eq!(tok.texts_to_sequence("movie zzz movie"), vec![1, 1]);
    }

    #[test]
    fn test_post_padding_and_truncation() {
        let tok = tokenizer();
        assert_eq!(tok.encode("great movie", 5), vec![3, 2, 0, 0, 0]);
        assert_eq!(tok.encode("great movie plot great", 2), vec![3, 2]);
        assert_eq!(tok.encode("", 3), vec![0, 0, 0]);
    }

    #[test]
    fn test_zero_weights_score_half() {
        let cfg = SequenceModelConfig {
            vocab_size: 16,
            embedding_dim: 4,
            lstm1_units: 3,
            lstm2_units: 2,
            dense_units: 3,
        };
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        let backend =
            SequenceBackend::from_var_builder(tokenizer(), &cfg, vb, Device::Cpu, 8).unwrap();
        let score = backend.score("great movie").unwrap();
        assert!((score - 0.5).abs() < 1e-6);
    }
}
