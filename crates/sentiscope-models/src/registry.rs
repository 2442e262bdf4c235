//! Model registry initialization and management
//!
//! The registry is populated once at startup. Every backend ends up in a slot:
//! either holding its trained handle or the heuristic stub. Nothing here
//! propagates a backend failure past `load_all`.

use crate::artifacts::{self, ArtifactStore};
use crate::backend::{Backend, BackendKind, BackendName, BackendSlot, LoadStatus};
use crate::config::ModelsConfig;
use crate::normalizer::{Normalizer, NormalizerMode};
use crate::sequence::SequenceBackend;
use crate::sparse_linear::SparseLinearPipeline;
use crate::transformer::TransformerBackend;
use candle_core::Device;
use sentiscope_core::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Registry of backend slots plus the shared normalizer
pub struct ModelRegistry {
    config: ModelsConfig,
    store: ArtifactStore,
    normalizer: Normalizer,
    slots: BTreeMap<BackendName, BackendSlot>,
}

/// Per-backend status row
#[derive(Debug, Clone, Serialize)]
pub struct SlotStatus {
    pub name: BackendName,
    pub kind: BackendKind,
    #[serde(flatten)]
    pub status: LoadStatus,
}

impl ModelRegistry {
    /// Create an empty registry; the normalizer is built immediately
    pub fn new(config: ModelsConfig) -> Result<Self> {
        let normalizer = Normalizer::from_resource(config.lemma_resource.as_deref())?;
        let store = ArtifactStore::new(config.artifacts_dir.clone());

        Ok(Self {
            config,
            store,
            normalizer,
            slots: BTreeMap::new(),
        })
    }

    /// Build and populate in one step
    pub fn load(config: ModelsConfig) -> Result<Self> {
        let mut registry = Self::new(config)?;
        registry.load_all();
        Ok(registry)
    }

    /// Attempt every backend once, substituting the stub on absence or failure.
    ///
    /// Calling it again only retries slots that ended up as stubs.
    pub fn load_all(&mut self) {
        info!(
            "Initializing model registry from {}",
            self.store.root().display()
        );

        let device = match artifacts::create_device(self.config.device) {
            Ok(device) => device,
            Err(e) => {
                warn!("{}; falling back to CPU", e);
                Device::Cpu
            }
        };

        for name in BackendName::ALL {
            if self.slots.get(&name).is_some_and(|slot| !slot.is_stub()) {
                continue;
            }

            let slot = match self.load_backend(name, &device) {
                Ok(backend) => {
                    info!("✓ {}: loaded {}", name, backend.kind());
                    BackendSlot::loaded(name, backend)
                }
                Err(Error::ArtifactMissing(_)) => {
                    info!("• {}: no artifact, using heuristic stub", name);
                    BackendSlot::stub(name, LoadStatus::Stub)
                }
                Err(e) => {
                    let reason = match e {
                        Error::ArtifactLoad { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    warn!("✗ {}: load failed ({}), using heuristic stub", name, reason);
                    BackendSlot::stub(name, LoadStatus::Failed(reason))
                }
            };
            self.slots.insert(name, slot);
        }

        info!(
            "Model registry initialized with {}/{} trained backends",
            self.trained_count(),
            BackendName::ALL.len()
        );
    }

    fn load_backend(&self, name: BackendName, device: &Device) -> Result<Backend> {
        self.try_load_backend(name, device)
            .map_err(|e| artifacts::as_load_failure(name, e))
    }

    fn try_load_backend(&self, name: BackendName, device: &Device) -> Result<Backend> {
        let backend = match name {
            BackendName::NaiveBayes => {
                Backend::SparseLinearA(SparseLinearPipeline::load(self.store.locate(name)?)?)
            }
            BackendName::LogisticRegression => {
                Backend::SparseLinearB(SparseLinearPipeline::load(self.store.locate(name)?)?)
            }
            BackendName::RnnLstm => Backend::SequenceModel(SequenceBackend::load(
                &self.store,
                &self.config.sequence,
                device,
            )?),
            BackendName::DistilBert => Backend::Transformer(Box::new(TransformerBackend::load(
                &self.store,
                &self.config.transformer,
                device,
            )?)),
        };
        Ok(backend)
    }

    /// Get a slot by name
    pub fn get(&self, name: BackendName) -> Option<&BackendSlot> {
        self.slots.get(&name)
    }

    /// Get a slot by its wire name
    pub fn get_by_str(&self, name: &str) -> Result<&BackendSlot> {
        let name: BackendName = name.parse()?;
        self.get(name)
            .ok_or_else(|| Error::UnknownBackendName(name.to_string()))
    }

    /// Populated backend names, in fixed order
    pub fn names(&self) -> Vec<BackendName> {
        self.slots.keys().copied().collect()
    }

    /// Slots in fixed order
    pub fn slots(&self) -> impl Iterator<Item = &BackendSlot> {
        self.slots.values()
    }

    /// Load status of every slot
    pub fn status(&self) -> Vec<SlotStatus> {
        self.slots
            .values()
            .map(|slot| SlotStatus {
                name: slot.name(),
                kind: slot.kind(),
                status: slot.status().clone(),
            })
            .collect()
    }

    /// Number of slots holding a trained backend
    pub fn trained_count(&self) -> usize {
        self.slots.values().filter(|slot| !slot.is_stub()).count()
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn normalizer_mode(&self) -> NormalizerMode {
        self.normalizer.mode()
    }

    pub fn config(&self) -> &ModelsConfig {
        &self.config
    }
}

/// Shared model registry for application-wide use
pub struct SharedRegistry {
    registry: Arc<ModelRegistry>,
}

impl SharedRegistry {
    /// Wrap a fully loaded registry
    pub fn new(registry: ModelRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Get reference to the registry
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Clone the Arc for sharing across threads
    pub fn clone_arc(&self) -> Arc<ModelRegistry> {
        Arc::clone(&self.registry)
    }
}

impl Clone for SharedRegistry {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_store() -> (tempfile::TempDir, ModelRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelsConfig::default().with_artifacts_dir(dir.path());
        let registry = ModelRegistry::load(config).unwrap();
        (dir, registry)
    }

    #[test]
    fn test_empty_store_yields_four_stubs() {
        let (_dir, registry) = empty_store();
        assert_eq!(registry.names(), BackendName::ALL.to_vec());
        assert_eq!(registry.trained_count(), 0);
        for slot in registry.slots() {
            assert_eq!(slot.kind(), BackendKind::HeuristicStub);
            assert_eq!(slot.status(), &LoadStatus::Stub);
        }
    }

    #[test]
    fn test_get_by_str() {
        let (_dir, registry) = empty_store();
        assert!(registry.get_by_str("rnn_lstm").is_ok());
        assert!(matches!(
            registry.get_by_str("bert"),
            Err(Error::UnknownBackendName(_))
        ));
    }

    #[test]
    fn test_load_all_is_idempotent() {
        let (_dir, mut registry) = empty_store();
        registry.load_all();
        assert_eq!(registry.names().len(), 4);
    }

    #[test]
    fn test_shared_registry_clones_arc() {
        let (_dir, registry) = empty_store();
        let shared = SharedRegistry::new(registry);
        let other = shared.clone();
        assert!(Arc::ptr_eq(shared.registry(), &other.clone_arc()));
    }
}
