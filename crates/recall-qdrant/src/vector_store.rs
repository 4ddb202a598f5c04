use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use recall_cache::{fingerprint, CacheConfig, QueryCache};
use recall_core::{
    validate_batch, validate_vector, BackendHealth, BackendKind, Metadata, RecallError, SearchHit,
    VectorStore,
};
use recall_resilience::{Retrier, RetryPolicy};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::backend::{GrpcBackend, IndexBackend, RemotePoint};
use crate::point_id::{derive_point_id, PointKey};

/// Default gRPC endpoint.
pub const DEFAULT_URL: &str = "http://qdrant:6334";

// ---------------------------------------------------------------------------
// QdrantConfig
// ---------------------------------------------------------------------------

/// Configuration for connecting to a Qdrant instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    /// Qdrant gRPC URL (e.g. `http://localhost:6334`).
    pub url: String,
    /// Name of the collection to operate on.
    pub collection_name: String,
    /// Dimensionality of the embedding vectors.
    pub vector_size: u64,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Upper bound on every single remote call.
    pub request_timeout: Duration,
    pub connect_retry: RetryPolicy,
    pub collection_retry: RetryPolicy,
    pub upsert_retry: RetryPolicy,
    pub search_retry: RetryPolicy,
    pub cache: CacheConfig,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            collection_name: "documents".to_string(),
            vector_size: 384,
            api_key: None,
            request_timeout: Duration::from_secs(10),
            connect_retry: RetryPolicy::new(5, Duration::from_secs(2)),
            collection_retry: RetryPolicy::new(3, Duration::from_secs(1)),
            upsert_retry: RetryPolicy::new(3, Duration::from_secs(1)),
            search_retry: RetryPolicy::new(2, Duration::from_millis(500)),
            cache: CacheConfig::default(),
        }
    }
}

impl QdrantConfig {
    /// Create a new config with the required parameters and default policies.
    pub fn new(
        url: impl Into<String>,
        collection_name: impl Into<String>,
        vector_size: u64,
    ) -> Self {
        Self {
            url: url.into(),
            collection_name: collection_name.into(),
            vector_size,
            ..Self::default()
        }
    }

    /// Set the API key for authenticated access.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_retry(mut self, policy: RetryPolicy) -> Self {
        self.connect_retry = policy;
        self
    }

    pub fn with_collection_retry(mut self, policy: RetryPolicy) -> Self {
        self.collection_retry = policy;
        self
    }

    pub fn with_upsert_retry(mut self, policy: RetryPolicy) -> Self {
        self.upsert_retry = policy;
        self
    }

    pub fn with_search_retry(mut self, policy: RetryPolicy) -> Self {
        self.search_retry = policy;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

// ---------------------------------------------------------------------------
// QdrantVectorStore
// ---------------------------------------------------------------------------

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Construction never fails because the server is down: the store starts
/// unhealthy and reconnects lazily on the next call. While unhealthy,
/// `search` returns no hits and `upsert` returns [`RecallError::Unavailable`].
///
/// Each stored record becomes one point whose payload is the record's
/// metadata, field for field. Point ids come from [`derive_point_id`].
pub struct QdrantVectorStore {
    config: QdrantConfig,
    backend: Arc<dyn IndexBackend>,
    health: RwLock<BackendHealth>,
    /// Held for the duration of every upsert and search.
    cache: Mutex<QueryCache<Vec<SearchHit>>>,
}

impl QdrantVectorStore {
    /// Build a gRPC client for `config.url` and initialize against it.
    ///
    /// Fails only if the client cannot be built; an unreachable server
    /// yields an unhealthy store.
    pub async fn connect(config: QdrantConfig) -> Result<Self, RecallError> {
        let backend = GrpcBackend::new(&config)?;
        Ok(Self::with_backend(config, Arc::new(backend)).await)
    }

    /// Initialize against an existing backend.
    pub async fn with_backend(config: QdrantConfig, backend: Arc<dyn IndexBackend>) -> Self {
        let store = Self {
            cache: Mutex::new(QueryCache::new(config.cache.clone())),
            health: RwLock::new(BackendHealth::unhealthy("not yet connected")),
            config,
            backend,
        };
        store.initialize().await;
        tracing::debug!(
            collection = %store.config.collection_name,
            dimension = store.config.vector_size,
            healthy = store.is_healthy(),
            "initialized Qdrant store"
        );
        store
    }

    /// Return a reference to the config.
    pub fn config(&self) -> &QdrantConfig {
        &self.config
    }

    pub fn is_healthy(&self) -> bool {
        self.health.read().unwrap_or_else(PoisonError::into_inner).healthy
    }

    /// Number of cached query results currently held.
    pub async fn cached_queries(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Connect and make sure the collection exists. Updates health either way.
    async fn initialize(&self) -> bool {
        let connected = Retrier::new(self.config.connect_retry.clone())
            .execute("Qdrant connection initialization", || {
                self.timed(self.backend.health_check())
            })
            .await;
        if let Err(exhausted) = connected {
            self.mark_unhealthy(format!("Qdrant unreachable: {exhausted}"));
            return false;
        }

        let operation = format!("Collection '{}' setup", self.config.collection_name);
        let ensured = Retrier::new(self.config.collection_retry.clone())
            .execute(&operation, || self.ensure_collection())
            .await;
        if let Err(exhausted) = ensured {
            self.mark_unhealthy(format!("collection unavailable: {exhausted}"));
            return false;
        }

        self.mark_healthy();
        true
    }

    /// Healthy, or reconnected on the spot.
    async fn ensure_ready(&self) -> bool {
        if self.is_healthy() {
            return true;
        }
        tracing::info!(
            collection = %self.config.collection_name,
            "attempting to restore Qdrant connection"
        );
        self.initialize().await
    }

    async fn ensure_collection(&self) -> Result<(), RecallError> {
        let name = &self.config.collection_name;
        if self.timed(self.backend.collection_exists(name)).await? {
            return Ok(());
        }
        tracing::info!(
            collection = %name,
            dimension = self.config.vector_size,
            "creating collection"
        );
        match self
            .timed(self.backend.create_collection(name, self.config.vector_size))
            .await
        {
            Err(err) if is_already_exists(&err) => Ok(()),
            other => other,
        }
    }

    async fn timed<T>(
        &self,
        call: impl Future<Output = Result<T, RecallError>>,
    ) -> Result<T, RecallError> {
        let limit = self.config.request_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(RecallError::Timeout(format!("no response within {limit:?}"))))
    }

    /// Drop candidates whose id is already stored with the same content hash.
    ///
    /// A stored id with a different hash is kept so the write replaces it.
    /// Candidates without a hash are always kept.
    async fn unstored_points(
        &self,
        candidates: Vec<RemotePoint>,
    ) -> Result<Vec<RemotePoint>, RecallError> {
        let keys: Vec<PointKey> = candidates.iter().map(|p| p.key.clone()).collect();
        let stored = self
            .timed(self.backend.stored_hashes(&self.config.collection_name, &keys))
            .await?;

        Ok(candidates
            .into_iter()
            .filter(|p| match (stored.get(&p.key), p.payload.hash()) {
                (Some(Some(stored_hash)), Some(hash)) => stored_hash != hash,
                _ => true,
            })
            .collect())
    }

    fn upsert_unavailable(&self, message: String) -> RecallError {
        self.mark_unhealthy(message.clone());
        RecallError::Unavailable(message)
    }

    fn mark_healthy(&self) {
        let mut health = self.health.write().unwrap_or_else(PoisonError::into_inner);
        if !health.healthy {
            tracing::info!(collection = %self.config.collection_name, "Qdrant store healthy");
        }
        *health = BackendHealth::healthy();
    }

    fn mark_unhealthy(&self, reason: String) {
        let mut health = self.health.write().unwrap_or_else(PoisonError::into_inner);
        tracing::error!(
            collection = %self.config.collection_name,
            %reason,
            "Qdrant store unhealthy"
        );
        *health = BackendHealth::unhealthy(reason);
    }
}

fn is_already_exists(err: &RecallError) -> bool {
    err.to_string().to_ascii_lowercase().contains("already exists")
}

/// Points for a batch, keeping the first record for each hash and each id.
fn build_points(vectors: Vec<Vec<f32>>, metadatas: Vec<Metadata>) -> Vec<RemotePoint> {
    let mut seen_keys = HashSet::new();
    let mut seen_hashes = HashSet::new();
    let mut points = Vec::with_capacity(vectors.len());

    for (index, (vector, payload)) in vectors.into_iter().zip(metadatas).enumerate() {
        if let Some(hash) = payload.hash() {
            if !seen_hashes.insert(hash.to_string()) {
                continue;
            }
        }
        let key = derive_point_id(&payload, index);
        if !seen_keys.insert(key.clone()) {
            continue;
        }
        points.push(RemotePoint {
            key,
            vector,
            payload,
        });
    }
    points
}

// ---------------------------------------------------------------------------
// VectorStore implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn upsert(
        &self,
        vectors: Vec<Vec<f32>>,
        metadatas: Vec<Metadata>,
    ) -> Result<usize, RecallError> {
        validate_batch(&vectors, &metadatas, self.dimension())?;

        if !self.ensure_ready().await {
            tracing::error!(
                collection = %self.config.collection_name,
                "Qdrant unavailable, upsert rejected"
            );
            return Err(RecallError::Unavailable(
                "Qdrant service is currently unavailable".to_string(),
            ));
        }

        let candidates = build_points(vectors, metadatas);
        if candidates.is_empty() {
            return Ok(0);
        }

        let mut cache = self.cache.lock().await;
        let lookup = format!("Point lookup in collection '{}'", self.config.collection_name);
        let fresh = match Retrier::new(self.config.upsert_retry.clone())
            .execute(&lookup, || self.unstored_points(candidates.clone()))
            .await
        {
            Ok(fresh) => fresh,
            Err(exhausted) => return Err(self.upsert_unavailable(exhausted.to_string())),
        };
        if fresh.is_empty() {
            tracing::debug!(
                submitted = candidates.len(),
                collection = %self.config.collection_name,
                "all points already stored"
            );
            return Ok(0);
        }

        // Writes replace by id, so a retried write after a lost acknowledgement
        // stores the same points again.
        let inserted = fresh.len();
        let operation = format!("Upsert to collection '{}'", self.config.collection_name);
        let written = Retrier::new(self.config.upsert_retry.clone())
            .execute(&operation, || {
                self.timed(
                    self.backend
                        .upsert_points(&self.config.collection_name, fresh.clone()),
                )
            })
            .await;

        match written {
            Ok(()) => {
                cache.clear();
                tracing::debug!(
                    inserted,
                    submitted = candidates.len(),
                    collection = %self.config.collection_name,
                    "upserted into Qdrant"
                );
                Ok(inserted)
            }
            Err(exhausted) => Err(self.upsert_unavailable(exhausted.to_string())),
        }
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, RecallError> {
        validate_vector(query, self.dimension())?;
        if k == 0 {
            return Ok(Vec::new());
        }

        if !self.ensure_ready().await {
            tracing::warn!(
                collection = %self.config.collection_name,
                "Qdrant unavailable, returning no results"
            );
            return Ok(Vec::new());
        }

        let mut cache = self.cache.lock().await;
        let key = fingerprint(query, k);
        if let Some(cached) = cache.lookup(&key) {
            return Ok(cached);
        }

        let operation = format!("Search in collection '{}'", self.config.collection_name);
        let found = Retrier::new(self.config.search_retry.clone())
            .execute(&operation, || {
                self.timed(self.backend.search(&self.config.collection_name, query, k))
            })
            .await;

        match found {
            Ok(hits) => {
                tracing::debug!(returned = hits.len(), k, "Qdrant search");
                cache.insert(key, hits.clone());
                Ok(hits)
            }
            Err(exhausted) => {
                self.mark_unhealthy(exhausted.to_string());
                tracing::warn!(
                    collection = %self.config.collection_name,
                    "search failed, returning no results"
                );
                Ok(Vec::new())
            }
        }
    }

    fn dimension(&self) -> usize {
        self.config.vector_size as usize
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Qdrant
    }

    fn health(&self) -> BackendHealth {
        self.health
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
