use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use recall_core::{BackendKind, Generator, GeneratorKind, Metadata, RecallError};
use recall_embeddings::HashingEmbeddings;
use recall_orchestrator::{
    build_store, Chunk, IngestReport, Orchestrator, OrchestratorConfig, StoreConfig,
    StubGenerator,
};
use recall_qdrant::{FakeIndexBackend, QdrantConfig, QdrantVectorStore, RetryPolicy};
use recall_vectorstores::InMemoryVectorStore;

const DIM: usize = 256;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

fn policy_chunks() -> Vec<Chunk> {
    vec![
        Chunk::new("Returns.md", "Refunds are issued within five business days.")
            .with_section("Refunds"),
        Chunk::new("Returns.md", "Damaged items can be returned for free.")
            .with_section("Damage"),
        Chunk::new("Shipping.md", "Express shipping arrives in two days.")
            .with_section("Delivery"),
    ]
}

fn memory_engine(config: OrchestratorConfig) -> Orchestrator {
    Orchestrator::from_parts(
        config,
        Arc::new(HashingEmbeddings::new(DIM)),
        Arc::new(InMemoryVectorStore::new(DIM)),
        Arc::new(StubGenerator::new()),
    )
    .unwrap()
}

fn memory_config() -> OrchestratorConfig {
    OrchestratorConfig::new(StoreConfig::in_memory(DIM))
}

fn fast_qdrant_config() -> QdrantConfig {
    QdrantConfig::new("http://fake:6334", "policy_helper", DIM as u64)
        .with_connect_retry(RetryPolicy::new(1, Duration::from_millis(10)))
        .with_collection_retry(RetryPolicy::new(1, Duration::from_millis(10)))
        .with_upsert_retry(RetryPolicy::new(1, Duration::from_millis(10)))
        .with_search_retry(RetryPolicy::new(1, Duration::from_millis(10)))
}

/// A remote generator whose service is down.
struct DownGenerator;

#[async_trait]
impl Generator for DownGenerator {
    async fn generate(&self, _query: &str, _contexts: &[Metadata]) -> Result<String, RecallError> {
        Err(RecallError::Generation("upstream returned 503".to_string()))
    }

    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Remote
    }

    fn label(&self) -> String {
        "remote:test-model".to_string()
    }

    fn is_healthy(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Ingestion and question answering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ingest_counts_new_documents_and_chunks() {
    init_tracing();
    let engine = memory_engine(memory_config());

    let report = engine.ingest_chunks(&policy_chunks()).await.unwrap();
    assert_eq!(
        report,
        IngestReport {
            new_docs: 2,
            new_chunks: 3
        }
    );

    let again = engine.ingest_chunks(&policy_chunks()).await.unwrap();
    assert_eq!(again, IngestReport::default());

    let stats = engine.stats();
    assert_eq!(stats.total_docs, 2);
    assert_eq!(stats.total_chunks, 3);
    assert_eq!(stats.metrics.total_ingests, 2);
}

#[tokio::test]
async fn new_chunk_of_known_document_is_not_a_new_document() {
    let engine = memory_engine(memory_config());
    engine.ingest_chunks(&policy_chunks()).await.unwrap();

    let report = engine
        .ingest_chunks(&[Chunk::new("Shipping.md", "Standard shipping takes a week.")])
        .await
        .unwrap();
    assert_eq!(report.new_docs, 0);
    assert_eq!(report.new_chunks, 1);
}

#[tokio::test]
async fn empty_ingest_is_counted_but_stores_nothing() {
    let engine = memory_engine(memory_config());
    let report = engine.ingest_chunks(&[]).await.unwrap();
    assert_eq!(report, IngestReport::default());
    assert_eq!(engine.metrics_summary().total_ingests, 1);
}

#[tokio::test]
async fn retrieve_returns_closest_chunk_metadata() {
    let engine = memory_engine(memory_config());
    engine.ingest_chunks(&policy_chunks()).await.unwrap();

    let contexts = engine.retrieve("express shipping two days", 1).await.unwrap();

    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].get_str("title"), Some("Shipping.md"));
    assert_eq!(contexts[0].get_str("section"), Some("Delivery"));
    assert_eq!(engine.metrics_summary().total_asks, 0);
}

#[tokio::test]
async fn ask_answers_from_retrieved_contexts() {
    let engine = memory_engine(memory_config());
    engine.ingest_chunks(&policy_chunks()).await.unwrap();

    let answer = engine.ask("when are refunds issued", 2).await.unwrap();

    assert!(answer.starts_with("Answer (stub): Based on the following sources:"));
    assert!(answer.contains("- Returns.md — Refunds"));
    let summary = engine.metrics_summary();
    assert_eq!(summary.total_asks, 1);
    assert_eq!(summary.current_buffer_entries, 2);
}

#[tokio::test]
async fn ask_on_empty_store_still_answers() {
    let engine = memory_engine(memory_config().with_default_k(3));
    let answer = engine.ask_default("anything").await.unwrap();
    assert_eq!(answer, "Answer (stub): Based on the following sources:\nSummary:\n");
}

#[tokio::test]
async fn reset_metrics_keeps_catalog() {
    let engine = memory_engine(memory_config());
    engine.ingest_chunks(&policy_chunks()).await.unwrap();
    engine.ask("refunds", 2).await.unwrap();

    engine.reset_metrics();

    let stats = engine.stats();
    assert_eq!(stats.metrics.total_asks, 0);
    assert_eq!(stats.metrics.total_ingests, 0);
    assert_eq!(stats.metrics.current_buffer_entries, 0);
    assert_eq!(stats.total_docs, 2);
}

#[tokio::test]
async fn generator_failure_is_returned_and_not_counted() {
    let engine = Orchestrator::from_parts(
        memory_config().with_generator(GeneratorKind::Remote),
        Arc::new(HashingEmbeddings::new(DIM)),
        Arc::new(InMemoryVectorStore::new(DIM)),
        Arc::new(DownGenerator),
    )
    .unwrap();

    let err = engine.ask("refunds", 2).await.unwrap_err();
    assert!(matches!(err, RecallError::Generation(_)));

    let summary = engine.metrics_summary();
    assert_eq!(summary.total_asks, 0);
    assert_eq!(summary.current_buffer_entries, 1, "retrieval was still timed");

    let status = engine.service_status();
    assert!(!status.all_healthy);
    assert_eq!(
        status.status_message,
        "System running in degraded mode: AI generation service experiencing issues"
    );
    assert_eq!(engine.stats().llm_model, "remote:test-model");
}

#[test]
fn mismatched_dimensions_are_rejected() {
    let result = Orchestrator::from_parts(
        memory_config(),
        Arc::new(HashingEmbeddings::new(32)),
        Arc::new(InMemoryVectorStore::new(DIM)),
        Arc::new(StubGenerator::new()),
    );
    assert!(matches!(result, Err(RecallError::Config(_))));
}

// ---------------------------------------------------------------------------
// Health aggregation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn preferred_backends_are_operational() {
    let engine = memory_engine(memory_config());
    let status = engine.service_status();

    assert!(status.all_healthy);
    assert!(!status.any_degraded);
    assert_eq!(status.status_message, "All systems operational");
    assert_eq!(status.services.vector_store.kind, BackendKind::InMemory);
}

#[tokio::test]
async fn in_memory_fallback_is_reported_as_degraded() {
    let engine = memory_engine(OrchestratorConfig::default());
    let status = engine.service_status();

    assert!(status.all_healthy);
    assert!(status.any_degraded);
    assert_eq!(
        status.status_message,
        "System running in degraded mode: Vector search is using local storage (slower performance)"
    );
}

#[tokio::test(start_paused = true)]
async fn remote_store_health_is_evaluated_live() {
    init_tracing();
    let fake = Arc::new(FakeIndexBackend::unreachable());
    let store = QdrantVectorStore::with_backend(fast_qdrant_config(), fake.clone()).await;
    let engine = Orchestrator::from_parts(
        OrchestratorConfig::default(),
        Arc::new(HashingEmbeddings::new(DIM)),
        Arc::new(store),
        Arc::new(StubGenerator::new()),
    )
    .unwrap();

    let status = engine.service_status();
    assert!(!status.all_healthy);
    assert_eq!(
        status.status_message,
        "System running in degraded mode: Vector search service experiencing issues"
    );

    let err = engine.ingest_chunks(&policy_chunks()).await.unwrap_err();
    assert!(matches!(err, RecallError::Unavailable(_)));
    assert_eq!(engine.stats().total_docs, 0);
    assert_eq!(engine.metrics_summary().total_ingests, 0);

    fake.set_reachable(true);
    let report = engine.ingest_chunks(&policy_chunks()).await.unwrap();
    assert_eq!(report.new_chunks, 3);
    assert_eq!(engine.service_status().status_message, "All systems operational");

    let contexts = engine.retrieve("damaged items returned", 1).await.unwrap();
    assert_eq!(contexts[0].get_str("section"), Some("Damage"));
}

#[tokio::test]
async fn stats_serialize_flat() {
    let engine = memory_engine(memory_config().with_embedding_model("local-64"));
    engine.ingest_chunks(&policy_chunks()).await.unwrap();
    engine.ask("refunds", 1).await.unwrap();

    let value = serde_json::to_value(engine.stats()).unwrap();
    assert_eq!(value["total_docs"], 2);
    assert_eq!(value["embedding_model"], "local-64");
    assert_eq!(value["llm_model"], "stub");
    assert_eq!(value["vector_store"], "memory");
    assert_eq!(value["collection_name"], "policy_helper");
    assert_eq!(value["total_asks"], 1);
    assert!(value["p95_retrieval_latency_ms"].is_number());
    assert_eq!(
        value["service_health"]["status_message"],
        "All systems operational"
    );
}

// ---------------------------------------------------------------------------
// Store factory
// ---------------------------------------------------------------------------

#[tokio::test]
async fn build_store_honours_memory_preference() {
    let store = build_store(&StoreConfig::in_memory(DIM)).await;
    assert_eq!(store.kind(), BackendKind::InMemory);
    assert_eq!(store.dimension(), DIM);
    assert!(store.health().healthy);
}

#[tokio::test]
async fn build_store_keeps_unreachable_remote_store() {
    let remote = QdrantConfig::new("http://127.0.0.1:1", "unreachable", DIM as u64)
        .with_request_timeout(Duration::from_millis(500))
        .with_connect_retry(RetryPolicy::new(0, Duration::ZERO));
    let config = StoreConfig::qdrant("http://127.0.0.1:1", "unreachable", DIM).with_qdrant(remote);

    let store = build_store(&config).await;

    assert_eq!(store.kind(), BackendKind::Qdrant);
    assert!(!store.health().healthy);
    assert!(store.search(&vec![0.5; DIM], 2).await.unwrap().is_empty());
}
