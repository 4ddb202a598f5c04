use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex as StdMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, GetPointsBuilder, PointId, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use recall_core::{Metadata, RecallError, SearchHit};
use tokio::sync::Mutex;

use crate::payload::{metadata_to_payload, payload_to_metadata};
use crate::point_id::PointKey;
use crate::vector_store::QdrantConfig;

/// A point ready to be written to the remote index.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePoint {
    pub key: PointKey,
    pub vector: Vec<f32>,
    pub payload: Metadata,
}

/// The calls [`QdrantVectorStore`](crate::QdrantVectorStore) makes against
/// the remote index. Each method is a single attempt; retries, timeouts and
/// health tracking live in the store.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    async fn health_check(&self) -> Result<(), RecallError>;

    async fn collection_exists(&self, collection: &str) -> Result<bool, RecallError>;

    /// Create a cosine-distance collection of the given dimension.
    async fn create_collection(&self, collection: &str, dimension: u64) -> Result<(), RecallError>;

    /// The stored content `hash` of each of `ids` already present. Points
    /// stored without a hash map to `None`; absent ids are left out.
    async fn stored_hashes(
        &self,
        collection: &str,
        ids: &[PointKey],
    ) -> Result<HashMap<PointKey, Option<String>>, RecallError>;

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<RemotePoint>,
    ) -> Result<(), RecallError>;

    /// Up to `k` hits ordered by the remote's own ranking, payload included.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, RecallError>;
}

// ---------------------------------------------------------------------------
// GrpcBackend
// ---------------------------------------------------------------------------

/// Production backend speaking gRPC through `qdrant-client`.
pub struct GrpcBackend {
    client: Qdrant,
}

impl GrpcBackend {
    /// Build the client. Does not contact the server.
    pub fn new(config: &QdrantConfig) -> Result<Self, RecallError> {
        let mut builder = Qdrant::from_url(&config.url).timeout(config.request_timeout);
        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| RecallError::Config(format!("failed to build Qdrant client: {e}")))?;
        Ok(Self { client })
    }

    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Qdrant {
        &self.client
    }
}

#[async_trait]
impl IndexBackend for GrpcBackend {
    async fn health_check(&self) -> Result<(), RecallError> {
        self.client
            .health_check()
            .await
            .map(|_| ())
            .map_err(|e| RecallError::Backend(format!("health check failed: {e}")))
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, RecallError> {
        self.client
            .collection_exists(collection)
            .await
            .map_err(|e| RecallError::Backend(format!("collection_exists check failed: {e}")))
    }

    async fn create_collection(&self, collection: &str, dimension: u64) -> Result<(), RecallError> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(VectorParamsBuilder::new(dimension, Distance::Cosine)),
            )
            .await
            .map(|_| ())
            .map_err(|e| RecallError::Backend(format!("failed to create collection: {e}")))
    }

    async fn stored_hashes(
        &self,
        collection: &str,
        ids: &[PointKey],
    ) -> Result<HashMap<PointKey, Option<String>>, RecallError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let point_ids: Vec<PointId> = ids.iter().cloned().map(PointId::from).collect();
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(collection, point_ids)
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await
            .map_err(|e| RecallError::Backend(format!("point lookup failed: {e}")))?;

        Ok(response
            .result
            .iter()
            .filter_map(|p| {
                let key = p.id.as_ref().and_then(PointKey::from_point_id)?;
                let hash = payload_to_metadata(&p.payload).hash().map(str::to_string);
                Some((key, hash))
            })
            .collect())
    }

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<RemotePoint>,
    ) -> Result<(), RecallError> {
        let points: Vec<PointStruct> = points
            .into_iter()
            .map(|p| {
                let payload = metadata_to_payload(&p.payload);
                PointStruct::new(PointId::from(p.key), p.vector, payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map(|_| ())
            .map_err(|e| RecallError::Backend(format!("upsert failed: {e}")))
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, RecallError> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, vector.to_vec(), k as u64).with_payload(true),
            )
            .await
            .map_err(|e| RecallError::Backend(format!("search failed: {e}")))?;

        Ok(response
            .result
            .into_iter()
            .map(|sp| SearchHit::new(sp.score, payload_to_metadata(&sp.payload)))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// FakeIndexBackend
// ---------------------------------------------------------------------------

/// Calls recorded by [`FakeIndexBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeCall {
    HealthCheck,
    CollectionExists,
    CreateCollection,
    StoredHashes,
    UpsertPoints,
    Search,
}

struct FakeCollection {
    dimension: usize,
    points: Vec<RemotePoint>,
}

/// In-memory stand-in for a Qdrant server.
///
/// Can be switched unreachable, made slow, or told to fail the next few
/// calls. Search ranks by exact cosine similarity.
pub struct FakeIndexBackend {
    reachable: AtomicBool,
    fail_next: AtomicUsize,
    latency: StdMutex<Duration>,
    calls: StdMutex<HashMap<FakeCall, usize>>,
    collections: Mutex<HashMap<String, FakeCollection>>,
}

impl FakeIndexBackend {
    pub fn new() -> Self {
        Self {
            reachable: AtomicBool::new(true),
            fail_next: AtomicUsize::new(0),
            latency: StdMutex::new(Duration::ZERO),
            calls: StdMutex::new(HashMap::new()),
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// A fake that refuses every call until [`set_reachable`](Self::set_reachable).
    pub fn unreachable() -> Self {
        let fake = Self::new();
        fake.set_reachable(false);
        fake
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Fail the next `count` calls regardless of reachability.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Delay every call by `latency` before answering.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    pub fn call_count(&self, call: FakeCall) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&call)
            .copied()
            .unwrap_or(0)
    }

    pub async fn point_count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .await
            .get(collection)
            .map_or(0, |c| c.points.len())
    }

    pub async fn has_collection(&self, collection: &str) -> bool {
        self.collections.lock().await.contains_key(collection)
    }

    async fn enter(&self, call: FakeCall) -> Result<(), RecallError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(call)
            .or_default() += 1;

        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let injected = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(RecallError::Backend(format!("injected failure in {call:?}")));
        }
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(RecallError::Backend("connection refused".to_string()));
        }
        Ok(())
    }
}

impl Default for FakeIndexBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexBackend for FakeIndexBackend {
    async fn health_check(&self) -> Result<(), RecallError> {
        self.enter(FakeCall::HealthCheck).await
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, RecallError> {
        self.enter(FakeCall::CollectionExists).await?;
        Ok(self.has_collection(collection).await)
    }

    async fn create_collection(&self, collection: &str, dimension: u64) -> Result<(), RecallError> {
        self.enter(FakeCall::CreateCollection).await?;
        let mut collections = self.collections.lock().await;
        if collections.contains_key(collection) {
            return Err(RecallError::Backend(format!(
                "collection `{collection}` already exists"
            )));
        }
        collections.insert(
            collection.to_string(),
            FakeCollection {
                dimension: dimension as usize,
                points: Vec::new(),
            },
        );
        Ok(())
    }

    async fn stored_hashes(
        &self,
        collection: &str,
        ids: &[PointKey],
    ) -> Result<HashMap<PointKey, Option<String>>, RecallError> {
        self.enter(FakeCall::StoredHashes).await?;
        let collections = self.collections.lock().await;
        let stored = collections
            .get(collection)
            .ok_or_else(|| RecallError::Backend(format!("collection `{collection}` not found")))?;
        Ok(stored
            .points
            .iter()
            .filter(|p| ids.contains(&p.key))
            .map(|p| (p.key.clone(), p.payload.hash().map(str::to_string)))
            .collect())
    }

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<RemotePoint>,
    ) -> Result<(), RecallError> {
        self.enter(FakeCall::UpsertPoints).await?;
        let mut collections = self.collections.lock().await;
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| RecallError::Backend(format!("collection `{collection}` not found")))?;

        if let Some(bad) = points.iter().find(|p| p.vector.len() != stored.dimension) {
            return Err(RecallError::Backend(format!(
                "wrong vector dimension: expected {}, got {}",
                stored.dimension,
                bad.vector.len()
            )));
        }
        for point in points {
            match stored.points.iter_mut().find(|p| p.key == point.key) {
                Some(existing) => *existing = point,
                None => stored.points.push(point),
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, RecallError> {
        self.enter(FakeCall::Search).await?;
        let collections = self.collections.lock().await;
        let stored = collections
            .get(collection)
            .ok_or_else(|| RecallError::Backend(format!("collection `{collection}` not found")))?;

        let mut hits: Vec<SearchHit> = stored
            .points
            .iter()
            .map(|p| SearchHit::new(cosine(vector, &p.vector), p.payload.clone()))
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}
