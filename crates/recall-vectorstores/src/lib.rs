mod in_memory;
mod top_k;

pub use in_memory::InMemoryVectorStore;
pub use recall_cache::CacheConfig;

// Re-export core traits/types so callers need a single import.
pub use recall_core::{BackendKind, Metadata, SearchHit, VectorStore};
