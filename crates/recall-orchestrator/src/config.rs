use recall_cache::CacheConfig;
use recall_core::{BackendKind, GeneratorKind};
use recall_qdrant::QdrantConfig;
use serde::{Deserialize, Serialize};

/// Which vector store to build and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Preferred backend. Anything else that ends up active counts as degraded.
    pub backend: BackendKind,
    pub dimension: usize,
    pub collection: String,
    /// Query cache settings, applied to whichever backend is built.
    pub cache: CacheConfig,
    /// Connection settings for the remote backend. Its collection name,
    /// vector size and cache are taken from the fields above.
    pub qdrant: QdrantConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Qdrant,
            dimension: 384,
            collection: "policy_helper".to_string(),
            cache: CacheConfig::default(),
            qdrant: QdrantConfig::default(),
        }
    }
}

impl StoreConfig {
    pub fn in_memory(dimension: usize) -> Self {
        Self {
            backend: BackendKind::InMemory,
            dimension,
            ..Self::default()
        }
    }

    pub fn qdrant(url: impl Into<String>, collection: impl Into<String>, dimension: usize) -> Self {
        let mut config = Self {
            backend: BackendKind::Qdrant,
            dimension,
            collection: collection.into(),
            ..Self::default()
        };
        config.qdrant.url = url.into();
        config
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_qdrant(mut self, qdrant: QdrantConfig) -> Self {
        self.qdrant = qdrant;
        self
    }

    /// The remote config with collection, dimension and cache filled in.
    pub fn qdrant_config(&self) -> QdrantConfig {
        QdrantConfig {
            collection_name: self.collection.clone(),
            vector_size: self.dimension as u64,
            cache: self.cache.clone(),
            ..self.qdrant.clone()
        }
    }
}

/// Top-level configuration for an [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub store: StoreConfig,
    /// Preferred generator. Running on anything else counts as degraded.
    pub generator: GeneratorKind,
    /// Label reported in stats for the embedding collaborator.
    pub embedding_model: String,
    /// Capacity of each latency ring buffer.
    pub metrics_buffer: usize,
    /// Number of contexts retrieved by `ask` when the caller has no preference.
    pub default_k: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            generator: GeneratorKind::Stub,
            embedding_model: "local-384".to_string(),
            metrics_buffer: 1000,
            default_k: 4,
        }
    }
}

impl OrchestratorConfig {
    pub fn new(store: StoreConfig) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    pub fn with_generator(mut self, generator: GeneratorKind) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_embedding_model(mut self, label: impl Into<String>) -> Self {
        self.embedding_model = label.into();
        self
    }

    pub fn with_metrics_buffer(mut self, capacity: usize) -> Self {
        self.metrics_buffer = capacity;
        self
    }

    pub fn with_default_k(mut self, k: usize) -> Self {
        self.default_k = k;
        self
    }
}
