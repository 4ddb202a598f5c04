//! Recall: top-k vector retrieval behind one [`VectorStore`](core::VectorStore)
//! contract, with an in-process backend and a Qdrant backend.
//!
//! This crate re-exports the Recall sub-crates for single-import usage.
//! Enable features to control which modules are available.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `default` | `vectorstores`, `embeddings` |
//! | `resilience` | `RetryPolicy`, `Retrier`, retry observers |
//! | `cache` | `QueryCache` with TTL and size bound |
//! | `embeddings` | Deterministic `HashingEmbeddings` |
//! | `vectorstores` | `InMemoryVectorStore` (exact cosine, cached) |
//! | `qdrant` | `QdrantVectorStore` with retries, health tracking and lazy reconnect |
//! | `orchestrator` | `Orchestrator`, store factory, health aggregation, latency metrics |
//! | `full` | All features enabled |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use recall::core::{Metadata, VectorStore};
//! use recall::vectorstores::InMemoryVectorStore;
//!
//! let store = InMemoryVectorStore::new(3);
//! store.upsert(vec![vec![1.0, 0.0, 0.0]], vec![Metadata::with_id_and_hash("a", "h1")]).await?;
//! let hits = store.search(&[1.0, 0.0, 0.0], 1).await?;
//! ```

/// Core traits and types: VectorStore, Embeddings, Generator, Metadata, RecallError.
/// Always available.
pub use recall_core as core;

/// Bounded retry with exponential backoff.
#[cfg(feature = "resilience")]
pub use recall_resilience as resilience;

/// TTL and size-bounded query result cache.
#[cfg(feature = "cache")]
pub use recall_cache as cache;

/// Deterministic feature-hashing embeddings.
#[cfg(feature = "embeddings")]
pub use recall_embeddings as embeddings;

/// In-process exact cosine vector store.
#[cfg(feature = "vectorstores")]
pub use recall_vectorstores as vectorstores;

/// Qdrant-backed vector store.
#[cfg(feature = "qdrant")]
pub use recall_qdrant as qdrant;

/// Ingestion, retrieval, health aggregation and metrics.
#[cfg(feature = "orchestrator")]
pub use recall_orchestrator as orchestrator;

pub use recall_core::{Metadata, RecallError, SearchHit, VectorStore};
