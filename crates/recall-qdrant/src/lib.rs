//! Qdrant vector store backend for Recall.
//!
//! [`QdrantVectorStore`] implements [`VectorStore`](recall_core::VectorStore)
//! on top of a remote [Qdrant](https://qdrant.tech/) collection. Every remote
//! call is bounded by a timeout and retried with exponential backoff; when
//! retries run out the store marks itself unhealthy, answers searches with no
//! hits, and reconnects lazily on the next call.
//!
//! The remote side sits behind [`IndexBackend`]: [`GrpcBackend`] for a real
//! server, [`FakeIndexBackend`] for tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use recall_qdrant::{QdrantConfig, QdrantVectorStore, VectorStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = QdrantConfig::new("http://localhost:6334", "docs", 384);
//! let store = QdrantVectorStore::connect(config).await?;
//! if !store.health().healthy {
//!     eprintln!("qdrant down: {:?}", store.health().reason);
//! }
//! # Ok(())
//! # }
//! ```

mod backend;
mod payload;
mod point_id;
mod vector_store;

pub use backend::{FakeCall, FakeIndexBackend, GrpcBackend, IndexBackend, RemotePoint};
pub use point_id::{derive_point_id, PointKey};
pub use vector_store::{QdrantConfig, QdrantVectorStore, DEFAULT_URL};

// Re-export core types for convenience.
pub use recall_core::{BackendHealth, BackendKind, Metadata, SearchHit, VectorStore};
pub use recall_resilience::RetryPolicy;
