//! Orchestration on top of Recall vector stores.
//!
//! [`Orchestrator`] embeds and ingests [`Chunk`]s, retrieves contexts for a
//! query and hands them to a [`Generator`](recall_core::Generator). Along the
//! way it records retrieval and generation latencies in fixed-size ring
//! buffers and aggregates the health of the store and generator into a
//! single [`ServiceStatus`].
//!
//! ```rust,no_run
//! use recall_orchestrator::{Chunk, Orchestrator, OrchestratorConfig, StoreConfig};
//!
//! # async fn example() -> Result<(), recall_core::RecallError> {
//! let engine = Orchestrator::new(OrchestratorConfig::new(StoreConfig::in_memory(384))).await?;
//! engine
//!     .ingest_chunks(&[Chunk::new("Returns.md", "Refunds are issued within 5 days.")])
//!     .await?;
//! let answer = engine.ask("How long do refunds take?", 4).await?;
//! println!("{answer}\n{}", engine.service_status().status_message);
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;
mod factory;
mod generator;
mod health;
mod ingest;
mod metrics;

pub use config::{OrchestratorConfig, StoreConfig};
pub use engine::{EngineStats, Orchestrator};
pub use factory::build_store;
pub use generator::StubGenerator;
pub use health::{HealthRecord, ServiceStatus, Services};
pub use ingest::{content_hash, Chunk, IngestReport};
pub use metrics::{LatencyBuffer, Metrics, MetricsSummary};
