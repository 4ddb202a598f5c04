use std::sync::Arc;

use recall_core::{BackendKind, VectorStore};
use recall_qdrant::QdrantVectorStore;
use recall_vectorstores::InMemoryVectorStore;

use crate::config::StoreConfig;

/// Build the configured vector store.
///
/// Never fails: when the remote client cannot even be built, the in-process
/// store is returned instead and shows up as degraded through its kind. An
/// unreachable server still yields the remote store, unhealthy.
pub async fn build_store(config: &StoreConfig) -> Arc<dyn VectorStore> {
    match config.backend {
        BackendKind::InMemory => in_memory(config),
        BackendKind::Qdrant => match QdrantVectorStore::connect(config.qdrant_config()).await {
            Ok(store) => Arc::new(store),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "failed to create Qdrant store, falling back to in-memory store"
                );
                in_memory(config)
            }
        },
    }
}

fn in_memory(config: &StoreConfig) -> Arc<dyn VectorStore> {
    Arc::new(InMemoryVectorStore::with_cache_config(
        config.dimension,
        config.cache.clone(),
    ))
}
