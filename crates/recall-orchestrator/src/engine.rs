use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use recall_core::{Embeddings, Generator, Metadata, RecallError, VectorStore};
use recall_embeddings::HashingEmbeddings;
use serde::Serialize;

use crate::config::OrchestratorConfig;
use crate::factory::build_store;
use crate::generator::StubGenerator;
use crate::health::{HealthRecord, ServiceStatus, Services};
use crate::ingest::{Chunk, IngestReport};
use crate::metrics::{Metrics, MetricsSummary};

#[derive(Default)]
struct Catalog {
    titles: HashSet<String>,
    chunks: usize,
}

/// Engine-wide statistics, with the metrics summary flattened in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStats {
    pub total_docs: usize,
    pub total_chunks: usize,
    pub embedding_model: String,
    pub llm_model: String,
    /// Configured store preference, not necessarily the active one.
    pub vector_store: String,
    pub collection_name: String,
    pub service_health: ServiceStatus,
    #[serde(flatten)]
    pub metrics: MetricsSummary,
}

/// Ties embeddings, a vector store and a generator together, and reports
/// on their health and latency.
pub struct Orchestrator {
    config: OrchestratorConfig,
    embeddings: Arc<dyn Embeddings>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    metrics: Mutex<Metrics>,
    catalog: Mutex<Catalog>,
}

impl Orchestrator {
    /// Build the configured store, a [`HashingEmbeddings`] of matching
    /// dimension and a [`StubGenerator`].
    pub async fn new(config: OrchestratorConfig) -> Result<Self, RecallError> {
        let store = build_store(&config.store).await;
        let embeddings = Arc::new(HashingEmbeddings::new(config.store.dimension));
        Self::from_parts(config, embeddings, store, Arc::new(StubGenerator::new()))
    }

    /// Assemble from existing collaborators.
    pub fn from_parts(
        config: OrchestratorConfig,
        embeddings: Arc<dyn Embeddings>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self, RecallError> {
        if embeddings.dimension() != store.dimension() {
            return Err(RecallError::Config(format!(
                "embedding dimension {} does not match store dimension {}",
                embeddings.dimension(),
                store.dimension()
            )));
        }

        let orchestrator = Self {
            metrics: Mutex::new(Metrics::new(config.metrics_buffer)),
            catalog: Mutex::new(Catalog::default()),
            config,
            embeddings,
            store,
            generator,
        };
        orchestrator.log_initialization_status();
        Ok(orchestrator)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Embed and store `chunks`, skipping content that is already stored.
    ///
    /// Store failures are returned; documents and chunks are only counted
    /// once the upsert succeeded.
    pub async fn ingest_chunks(&self, chunks: &[Chunk]) -> Result<IngestReport, RecallError> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let metadatas: Vec<Metadata> = chunks.iter().map(Chunk::to_metadata).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            self.embeddings.embed_documents(&texts).await?
        };

        let inserted = self.store.upsert(vectors, metadatas).await?;

        let new_docs = {
            let mut catalog = lock(&self.catalog);
            let before = catalog.titles.len();
            catalog
                .titles
                .extend(chunks.iter().map(|c| c.title.clone()));
            catalog.chunks += inserted;
            catalog.titles.len() - before
        };
        lock(&self.metrics).record_ingest();

        let report = IngestReport {
            new_docs,
            new_chunks: inserted,
        };
        tracing::info!(
            submitted = chunks.len(),
            new_chunks = report.new_chunks,
            new_docs = report.new_docs,
            "ingested chunks"
        );
        Ok(report)
    }

    /// Metadata of the `k` stored chunks closest to `query`.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Metadata>, RecallError> {
        let started = Instant::now();
        let vector = self.embeddings.embed_query(query).await?;
        let hits = self.store.search(&vector, k).await?;
        lock(&self.metrics).record_retrieval(elapsed_ms(started));

        tracing::debug!(returned = hits.len(), k, "retrieved contexts");
        Ok(hits.into_iter().map(|hit| hit.metadata).collect())
    }

    pub async fn generate(&self, query: &str, contexts: &[Metadata]) -> Result<String, RecallError> {
        let started = Instant::now();
        let answer = self.generator.generate(query, contexts).await?;
        let ms = elapsed_ms(started);
        {
            let mut metrics = lock(&self.metrics);
            metrics.record_generation(ms);
            metrics.record_ask();
        }
        tracing::debug!(latency_ms = ms, "generated answer");
        Ok(answer)
    }

    /// Retrieve `k` contexts and answer from them.
    pub async fn ask(&self, query: &str, k: usize) -> Result<String, RecallError> {
        let contexts = self.retrieve(query, k).await?;
        self.generate(query, &contexts).await
    }

    /// [`ask`](Self::ask) with the configured default `k`.
    pub async fn ask_default(&self, query: &str) -> Result<String, RecallError> {
        self.ask(query, self.config.default_k).await
    }

    /// Current health of both services, evaluated now.
    pub fn service_status(&self) -> ServiceStatus {
        ServiceStatus::new(Services {
            vector_store: HealthRecord::evaluate(
                self.store.kind(),
                self.config.store.backend,
                self.store.health().healthy,
            ),
            generator: HealthRecord::evaluate(
                self.generator.kind(),
                self.config.generator,
                self.generator.is_healthy(),
            ),
        })
    }

    pub fn metrics_summary(&self) -> MetricsSummary {
        lock(&self.metrics).summary()
    }

    pub fn stats(&self) -> EngineStats {
        let (total_docs, total_chunks) = {
            let catalog = lock(&self.catalog);
            (catalog.titles.len(), catalog.chunks)
        };
        EngineStats {
            total_docs,
            total_chunks,
            embedding_model: self.config.embedding_model.clone(),
            llm_model: self.generator.label(),
            vector_store: self.config.store.backend.to_string(),
            collection_name: self.config.store.collection.clone(),
            service_health: self.service_status(),
            metrics: self.metrics_summary(),
        }
    }

    /// Drop all latency samples and counters.
    pub fn reset_metrics(&self) {
        *lock(&self.metrics) = Metrics::new(self.config.metrics_buffer);
        tracing::info!("reset all metrics");
    }

    fn log_initialization_status(&self) {
        let status = self.service_status();
        let store = status.services.vector_store;
        let generator = status.services.generator;
        tracing::info!(
            vector_store = %store.kind,
            store_healthy = store.healthy,
            store_degraded = store.degraded,
            generator = %generator.kind,
            generator_healthy = generator.healthy,
            generator_degraded = generator.degraded,
            "orchestrator initialized"
        );
        if status.any_degraded {
            tracing::warn!(status = %status.status_message, "running in degraded mode");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
