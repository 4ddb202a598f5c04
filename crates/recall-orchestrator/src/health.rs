use recall_core::{BackendKind, GeneratorKind};
use serde::Serialize;

/// Health of one service as seen by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthRecord<K> {
    pub healthy: bool,
    /// The implementation actually running.
    #[serde(rename = "type")]
    pub kind: K,
    /// Running on something other than the preferred implementation, or unhealthy.
    pub degraded: bool,
}

impl<K: PartialEq> HealthRecord<K> {
    pub fn evaluate(kind: K, preferred: K, healthy: bool) -> Self {
        let degraded = kind != preferred || !healthy;
        Self {
            healthy,
            kind,
            degraded,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Services {
    pub vector_store: HealthRecord<BackendKind>,
    #[serde(rename = "llm")]
    pub generator: HealthRecord<GeneratorKind>,
}

/// Aggregated health snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub services: Services,
    pub any_degraded: bool,
    pub all_healthy: bool,
    pub status_message: String,
}

impl ServiceStatus {
    pub fn new(services: Services) -> Self {
        Self {
            any_degraded: services.vector_store.degraded || services.generator.degraded,
            all_healthy: services.vector_store.healthy && services.generator.healthy,
            status_message: status_message(&services),
            services,
        }
    }
}

const DEGRADED_PREFIX: &str = "System running in degraded mode: ";

fn status_message(services: &Services) -> String {
    let mut clauses = Vec::new();

    let store = &services.vector_store;
    if store.degraded {
        clauses.push(match store.kind {
            BackendKind::InMemory => "Vector search is using local storage (slower performance)",
            _ => "Vector search service experiencing issues",
        });
    }

    let generator = &services.generator;
    if generator.degraded {
        clauses.push(match generator.kind {
            GeneratorKind::Stub => "AI responses are using basic mode (reduced quality)",
            _ => "AI generation service experiencing issues",
        });
    }

    if clauses.is_empty() {
        "All systems operational".to_string()
    } else {
        format!("{DEGRADED_PREFIX}{}", clauses.join("; "))
    }
}
