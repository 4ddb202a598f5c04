use std::collections::HashSet;

use async_trait::async_trait;
use recall_cache::{fingerprint, CacheConfig, QueryCache};
use recall_core::{
    validate_batch, validate_vector, BackendHealth, BackendKind, Metadata, RecallError, SearchHit,
};
use tokio::sync::Mutex;

use crate::top_k::top_k_indices;
use crate::VectorStore;

/// Added to both norm factors so all-zero vectors score 0 instead of NaN.
const NORM_EPSILON: f32 = 1e-9;

/// Everything guarded by the store lock.
struct IndexState {
    /// Row-major, `metadata.len() * dimension` floats.
    vectors: Vec<f32>,
    metadata: Vec<Metadata>,
    hashes: HashSet<String>,
    /// L2 norm per stored row.
    norms: Vec<f32>,
    cache: QueryCache<Vec<SearchHit>>,
}

impl IndexState {
    fn row(&self, index: usize, dimension: usize) -> &[f32] {
        &self.vectors[index * dimension..(index + 1) * dimension]
    }

    /// Bring `norms` in line with the stored row count.
    fn refresh_norms(&mut self, dimension: usize) {
        let count = self.metadata.len();
        if self.norms.len() == count {
            return;
        }
        if self.norms.len() > count {
            self.norms.clear();
        }
        for i in self.norms.len()..count {
            let norm = l2_norm(self.row(i, dimension));
            self.norms.push(norm);
        }
    }

    fn similarities(&self, query: &[f32], dimension: usize) -> Vec<f32> {
        let query_norm = l2_norm(query) + NORM_EPSILON;
        (0..self.metadata.len())
            .map(|i| {
                let dot: f32 = self
                    .row(i, dimension)
                    .iter()
                    .zip(query)
                    .map(|(a, b)| a * b)
                    .sum();
                dot / (self.norms[i] * query_norm + NORM_EPSILON)
            })
            .collect()
    }
}

/// In-memory vector store using exact cosine similarity.
///
/// Content is deduplicated by the metadata `hash`. Norms are computed once
/// per stored vector, and repeated identical queries are answered from a
/// TTL cache that every successful insert clears.
pub struct InMemoryVectorStore {
    dimension: usize,
    state: Mutex<IndexState>,
}

impl InMemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self::with_cache_config(dimension, CacheConfig::default())
    }

    pub fn with_cache_config(dimension: usize, cache: CacheConfig) -> Self {
        tracing::debug!(dimension, ttl_secs = cache.ttl.as_secs(), "initialized in-memory store");
        Self {
            dimension,
            state: Mutex::new(IndexState {
                vectors: Vec::new(),
                metadata: Vec::new(),
                hashes: HashSet::new(),
                norms: Vec::new(),
                cache: QueryCache::new(cache),
            }),
        }
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.state.lock().await.metadata.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of cached query results currently held.
    pub async fn cached_queries(&self) -> usize {
        self.state.lock().await.cache.len()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(
        &self,
        vectors: Vec<Vec<f32>>,
        metadatas: Vec<Metadata>,
    ) -> Result<usize, RecallError> {
        validate_batch(&vectors, &metadatas, self.dimension)?;

        let mut state = self.state.lock().await;
        let mut inserted = 0;

        for (vector, meta) in vectors.into_iter().zip(metadatas) {
            if let Some(hash) = meta.hash() {
                if !state.hashes.insert(hash.to_string()) {
                    continue;
                }
            }
            state.vectors.extend_from_slice(&vector);
            state.metadata.push(meta);
            inserted += 1;
        }

        if inserted > 0 {
            state.refresh_norms(self.dimension);
            state.cache.clear();
        }

        tracing::debug!(
            inserted,
            total = state.metadata.len(),
            "upserted into in-memory store"
        );
        Ok(inserted)
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, RecallError> {
        validate_vector(query, self.dimension)?;

        let mut state = self.state.lock().await;
        if state.metadata.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let key = fingerprint(query, k);
        if let Some(cached) = state.cache.lookup(&key) {
            return Ok(cached);
        }

        state.refresh_norms(self.dimension);
        let sims = state.similarities(query, self.dimension);
        let results: Vec<SearchHit> = top_k_indices(&sims, k)
            .into_iter()
            .map(|i| SearchHit::new(sims[i], state.metadata[i].clone()))
            .collect();

        state.cache.insert(key, results.clone());
        tracing::debug!(returned = results.len(), k, "in-memory search");
        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn kind(&self) -> BackendKind {
        BackendKind::InMemory
    }

    fn health(&self) -> BackendHealth {
        BackendHealth::healthy()
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
