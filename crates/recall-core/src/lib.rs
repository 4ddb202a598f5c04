use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unified error type for Recall with variants covering every backend and collaborator.
#[derive(Debug, Error)]
pub enum RecallError {
    /// Malformed input such as a dimension mismatch. Never retried.
    #[error("validation error: {0}")]
    Validation(String),
    /// The backend cannot take writes right now (down, or retries exhausted).
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A single remote call failed; retryable.
    #[error("backend error: {0}")]
    Backend(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("generation error: {0}")]
    Generation(String),
    #[error("config error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Metadata attached to a stored vector.
///
/// A flat JSON object. Two keys carry meaning for the stores:
/// - `id`: stable identifier (string or unsigned integer)
/// - `hash`: content fingerprint used to skip re-ingested content
///
/// Everything else (`title`, `section`, `text`, ...) is caller-defined and
/// returned untouched by `search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    fields: HashMap<String, Value>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for the common `id` + `hash` pair.
    pub fn with_id_and_hash(id: impl Into<Value>, hash: impl Into<String>) -> Self {
        Self::new()
            .with_field("id", id)
            .with_field("hash", Value::String(hash.into()))
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Look up a string field, ignoring values of any other JSON type.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&Value> {
        self.fields.get("id")
    }

    /// The content fingerprint, if present and a non-empty string.
    pub fn hash(&self) -> Option<&str> {
        self.get_str("hash").filter(|h| !h.is_empty())
    }

    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> HashMap<String, Value> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<HashMap<String, Value>> for Metadata {
    fn from(fields: HashMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl FromIterator<(String, Value)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// One ranked hit: the similarity score and the stored metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub score: f32,
    pub metadata: Metadata,
}

impl SearchHit {
    pub fn new(score: f32, metadata: Metadata) -> Self {
        Self { score, metadata }
    }
}

// ---------------------------------------------------------------------------
// Backend tags and health
// ---------------------------------------------------------------------------

/// Which vector store implementation is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    #[serde(rename = "memory", alias = "in_memory")]
    InMemory,
    #[serde(rename = "qdrant")]
    Qdrant,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::InMemory => "memory",
            BackendKind::Qdrant => "qdrant",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = RecallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in_memory" | "in-memory" => Ok(BackendKind::InMemory),
            "qdrant" => Ok(BackendKind::Qdrant),
            other => Err(RecallError::Config(format!(
                "unknown vector store backend: {other}"
            ))),
        }
    }
}

/// Which answer generator implementation is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    /// Built-in extractive fallback, no external service.
    Stub,
    /// A real language model behind some external service.
    Remote,
}

impl GeneratorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratorKind::Stub => "stub",
            GeneratorKind::Remote => "remote",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a backend can currently serve requests, and why not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHealth {
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BackendHealth {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            reason: None,
        }
    }

    pub fn unhealthy(reason: impl Into<String>) -> Self {
        Self {
            healthy: false,
            reason: Some(reason.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

/// Reject vectors of the wrong dimension or with non-finite components.
pub fn validate_vector(vector: &[f32], dimension: usize) -> Result<(), RecallError> {
    if vector.len() != dimension {
        return Err(RecallError::Validation(format!(
            "expected vector of dimension {dimension}, got {}",
            vector.len()
        )));
    }
    if let Some(pos) = vector.iter().position(|x| !x.is_finite()) {
        return Err(RecallError::Validation(format!(
            "vector component {pos} is not finite"
        )));
    }
    Ok(())
}

/// Validate an upsert batch: matching lengths, every vector well-formed.
pub fn validate_batch(
    vectors: &[Vec<f32>],
    metadatas: &[Metadata],
    dimension: usize,
) -> Result<(), RecallError> {
    if vectors.len() != metadatas.len() {
        return Err(RecallError::Validation(format!(
            "got {} vectors but {} metadata records",
            vectors.len(),
            metadatas.len()
        )));
    }
    vectors
        .iter()
        .try_for_each(|v| validate_vector(v, dimension))
}

// ---------------------------------------------------------------------------
// VectorStore trait
// ---------------------------------------------------------------------------

/// Trait for vector storage backends.
///
/// Both implementations behave identically from the caller's side: the only
/// observable difference is [`VectorStore::kind`] and [`VectorStore::health`].
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert each (vector, metadata) pair unless its `hash` is already stored.
    ///
    /// Returns the number of pairs actually inserted.
    async fn upsert(
        &self,
        vectors: Vec<Vec<f32>>,
        metadatas: Vec<Metadata>,
    ) -> Result<usize, RecallError>;

    /// Up to `k` hits by descending cosine similarity.
    ///
    /// An empty store or a backend that cannot currently serve yields an empty
    /// list, not an error. Only malformed queries are rejected.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, RecallError>;

    /// Dimension every stored vector must have.
    fn dimension(&self) -> usize;

    fn kind(&self) -> BackendKind;

    fn health(&self) -> BackendHealth;
}

// ---------------------------------------------------------------------------
// Embeddings trait
// ---------------------------------------------------------------------------

/// Trait for embedding text into vectors.
///
/// Implementations must be deterministic: cache keys and point identifiers
/// rely on identical text producing identical vectors.
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Embed multiple texts (for batch document embedding).
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RecallError>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RecallError>;

    fn dimension(&self) -> usize;
}

// ---------------------------------------------------------------------------
// Generator trait
// ---------------------------------------------------------------------------

/// Produces an answer from a query and the retrieved contexts.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, query: &str, contexts: &[Metadata]) -> Result<String, RecallError>;

    fn kind(&self) -> GeneratorKind;

    /// Human-readable model label reported in stats.
    fn label(&self) -> String {
        self.kind().as_str().to_string()
    }

    fn is_healthy(&self) -> bool {
        true
    }
}
