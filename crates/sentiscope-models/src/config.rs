//! Configuration for the artifact store, backends and explanations

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Configuration for the model layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Root of the artifact store
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Lemma lexicon used by the text normalizer.
    ///
    /// When unset or unreadable the normalizer runs in degraded mode.
    #[serde(default)]
    pub lemma_resource: Option<PathBuf>,

    /// Device for the neural backends
    #[serde(default)]
    pub device: DeviceSpec,

    /// Sequence model settings
    #[serde(default)]
    pub sequence: SequenceConfig,

    /// Transformer settings
    #[serde(default)]
    pub transformer: TransformerConfig,

    /// Explanation settings
    #[serde(default)]
    pub explanation: ExplanationConfig,
}

/// Sequence model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// Fixed input length; padding and truncation both happen at the tail
    #[serde(default = "default_sequence_length")]
    pub max_length: usize,
}

/// Transformer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformerConfig {
    /// Maximum subword tokens per input
    #[serde(default = "default_transformer_length")]
    pub max_length: usize,
}

/// Explanation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationConfig {
    /// Number of words to report when the caller does not ask for a count
    #[serde(default = "default_num_features")]
    pub num_features: usize,

    /// Perturbed samples drawn per explanation
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,

    /// Width of the exponential proximity kernel
    #[serde(default = "default_kernel_width")]
    pub kernel_width: f64,

    /// L2 penalty of the local surrogate
    #[serde(default = "default_ridge_alpha")]
    pub ridge_alpha: f64,

    /// Fixed seed for the perturbation sampler
    #[serde(default)]
    pub seed: Option<u64>,

    /// Seed lexicon weights from (backend, text) instead of entropy
    #[serde(default)]
    pub deterministic_heuristic: bool,
}

/// Device specification (for config files)
///
/// Written as a bare name (`cpu`, `cuda`, `metal`) or as a one-key map
/// carrying the device index (`cuda: {index: 1}`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DeviceRepr", into = "DeviceRepr")]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda {
        index: Option<usize>,
    },
    Metal {
        index: Option<usize>,
    },
}

/// On-disk shape of [`DeviceSpec`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DeviceRepr {
    Name(String),
    Indexed(BTreeMap<String, DeviceIndex>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DeviceIndex {
    #[serde(default)]
    index: Option<usize>,
}

impl DeviceSpec {
    fn from_parts(kind: &str, index: Option<usize>) -> Result<Self, String> {
        match kind.to_ascii_lowercase().as_str() {
            "cpu" if index.is_none() => Ok(Self::Cpu),
            "cpu" => Err("cpu device takes no index".to_string()),
            "cuda" => Ok(Self::Cuda { index }),
            "metal" => Ok(Self::Metal { index }),
            other => Err(format!("unknown device '{}' (expected cpu, cuda or metal)", other)),
        }
    }
}

impl TryFrom<DeviceRepr> for DeviceSpec {
    type Error = String;

    fn try_from(repr: DeviceRepr) -> Result<Self, Self::Error> {
        match repr {
            DeviceRepr::Name(name) => Self::from_parts(&name, None),
            DeviceRepr::Indexed(map) => {
                let mut entries = map.into_iter();
                match (entries.next(), entries.next()) {
                    (Some((kind, device)), None) => Self::from_parts(&kind, device.index),
                    _ => Err("device map must have exactly one key".to_string()),
                }
            }
        }
    }
}

impl From<DeviceSpec> for DeviceRepr {
    fn from(spec: DeviceSpec) -> Self {
        let indexed = |kind: &str, index| {
            DeviceRepr::Indexed(BTreeMap::from([(kind.to_string(), DeviceIndex { index })]))
        };
        match spec {
            DeviceSpec::Cpu => DeviceRepr::Name("cpu".to_string()),
            DeviceSpec::Cuda { index } => indexed("cuda", index),
            DeviceSpec::Metal { index } => indexed("metal", index),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: default_artifacts_dir(),
            lemma_resource: None,
            device: DeviceSpec::Cpu,
            sequence: SequenceConfig::default(),
            transformer: TransformerConfig::default(),
            explanation: ExplanationConfig::default(),
        }
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            max_length: default_sequence_length(),
        }
    }
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            max_length: default_transformer_length(),
        }
    }
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            num_features: default_num_features(),
            num_samples: default_num_samples(),
            kernel_width: default_kernel_width(),
            ridge_alpha: default_ridge_alpha(),
            seed: None,
            deterministic_heuristic: false,
        }
    }
}

impl ModelsConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> sentiscope_core::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| {
            sentiscope_core::Error::config(format!("Invalid config {}: {}", path.display(), e))
        })
    }

    /// Use a different artifact store root
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    /// Use a lemma lexicon for normalization
    pub fn with_lemma_resource(mut self, path: impl Into<PathBuf>) -> Self {
        self.lemma_resource = Some(path.into());
        self
    }
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("./models/saved")
}

fn default_sequence_length() -> usize {
    200
}

fn default_transformer_length() -> usize {
    128
}

fn default_num_features() -> usize {
    12
}

fn default_num_samples() -> usize {
    5000
}

fn default_kernel_width() -> f64 {
    25.0
}

fn default_ridge_alpha() -> f64 {
    1.0
}
