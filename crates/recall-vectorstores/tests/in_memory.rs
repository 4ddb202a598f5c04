use std::collections::HashSet;
use std::time::Duration;

use recall_vectorstores::{
    BackendKind, CacheConfig, InMemoryVectorStore, Metadata, SearchHit, VectorStore,
};
use serde_json::json;

fn meta(id: &str, hash: &str) -> Metadata {
    Metadata::with_id_and_hash(id, hash).with_field("title", format!("{id}.md"))
}

fn ids(hits: &[SearchHit]) -> Vec<String> {
    hits.iter()
        .map(|h| h.metadata.get_str("id").unwrap_or_default().to_string())
        .collect()
}

/// Small deterministic generator so the brute-force comparison needs no RNG crate.
struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as f32 / (1u64 << 31) as f32) * 2.0 - 1.0
    }

    fn vector(&mut self, dim: usize) -> Vec<f32> {
        (0..dim).map(|_| self.next_f32()).collect()
    }
}

fn brute_force_cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (na * nb)
}

async fn abc_store() -> InMemoryVectorStore {
    let store = InMemoryVectorStore::new(4);
    let inserted = store
        .upsert(
            vec![
                vec![1.0, 0.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0, 0.0],
                vec![0.9, 0.1, 0.0, 0.0],
            ],
            vec![meta("A", "h1"), meta("B", "h2"), meta("C", "h3")],
        )
        .await
        .unwrap();
    assert_eq!(inserted, 3);
    store
}

#[tokio::test]
async fn end_to_end_top_two() {
    let store = abc_store().await;

    let results = store.search(&[1.0, 0.0, 0.0, 0.0], 2).await.unwrap();

    assert_eq!(ids(&results), vec!["A", "C"]);
    assert!((results[0].score - 1.0).abs() < 1e-5, "A score: {}", results[0].score);
    assert!((results[1].score - 0.9939).abs() < 1e-3, "C score: {}", results[1].score);
}

#[tokio::test]
async fn reingesting_same_hash_is_a_no_op() {
    let store = abc_store().await;

    let inserted = store
        .upsert(vec![vec![1.0, 0.0, 0.0, 0.0]], vec![meta("A", "h1")])
        .await
        .unwrap();

    assert_eq!(inserted, 0);
    assert_eq!(store.len().await, 3);
}

#[tokio::test]
async fn duplicate_hash_within_one_batch_is_inserted_once() {
    let store = InMemoryVectorStore::new(2);
    let inserted = store
        .upsert(
            vec![vec![1.0, 0.0], vec![1.0, 0.0]],
            vec![meta("x", "same"), meta("y", "same")],
        )
        .await
        .unwrap();
    assert_eq!(inserted, 1);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn records_without_hash_are_never_deduplicated() {
    let store = InMemoryVectorStore::new(2);
    let no_hash = Metadata::new().with_field("id", "loose");
    store
        .upsert(vec![vec![1.0, 0.0]], vec![no_hash.clone()])
        .await
        .unwrap();
    let inserted = store
        .upsert(vec![vec![1.0, 0.0]], vec![no_hash])
        .await
        .unwrap();
    assert_eq!(inserted, 1);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn empty_store_returns_empty_without_touching_cache() {
    let store = InMemoryVectorStore::new(3);
    for k in [1, 4, 100] {
        let results = store.search(&[0.1, 0.2, 0.3], k).await.unwrap();
        assert!(results.is_empty());
    }
    assert_eq!(store.cached_queries().await, 0);
}

#[tokio::test]
async fn k_zero_returns_empty() {
    let store = abc_store().await;
    assert!(store.search(&[1.0, 0.0, 0.0, 0.0], 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn k_larger_than_store_returns_everything_sorted() {
    let store = abc_store().await;
    let results = store.search(&[1.0, 0.0, 0.0, 0.0], 10).await.unwrap();
    assert_eq!(ids(&results), vec!["A", "C", "B"]);
}

#[tokio::test]
async fn dimension_mismatch_is_rejected() {
    let store = InMemoryVectorStore::new(4);
    let err = store
        .upsert(vec![vec![1.0, 0.0]], vec![meta("bad", "hb")])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("dimension 4"));
    assert_eq!(store.len().await, 0);

    assert!(store.search(&[1.0], 1).await.is_err());
}

#[tokio::test]
async fn mismatched_batch_lengths_are_rejected() {
    let store = InMemoryVectorStore::new(2);
    let result = store
        .upsert(vec![vec![1.0, 0.0], vec![0.0, 1.0]], vec![meta("one", "h")])
        .await;
    assert!(result.is_err());
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn zero_vector_scores_zero_instead_of_nan() {
    let store = InMemoryVectorStore::new(2);
    store
        .upsert(
            vec![vec![0.0, 0.0], vec![1.0, 0.0]],
            vec![meta("zero", "z"), meta("x", "x")],
        )
        .await
        .unwrap();

    let results = store.search(&[1.0, 0.0], 2).await.unwrap();
    assert_eq!(ids(&results), vec!["x", "zero"]);
    assert_eq!(results[1].score, 0.0);

    let zero_query = store.search(&[0.0, 0.0], 2).await.unwrap();
    assert!(zero_query.iter().all(|h| h.score.is_finite()));
}

#[tokio::test]
async fn ties_break_by_insertion_order() {
    let store = InMemoryVectorStore::new(2);
    store
        .upsert(
            vec![
                vec![0.0, 1.0],
                vec![1.0, 0.0],
                vec![2.0, 0.0],
                vec![3.0, 0.0],
            ],
            vec![meta("y", "hy"), meta("x1", "h1"), meta("x2", "h2"), meta("x3", "h3")],
        )
        .await
        .unwrap();

    let results = store.search(&[1.0, 0.0], 2).await.unwrap();
    assert_eq!(ids(&results), vec!["x1", "x2"]);
}

#[tokio::test]
async fn top_k_matches_brute_force() {
    let dim = 16;
    let mut rng = Lcg(42);
    let store = InMemoryVectorStore::new(dim);

    let vectors: Vec<Vec<f32>> = (0..300).map(|_| rng.vector(dim)).collect();
    let metas: Vec<Metadata> = (0..300)
        .map(|i| meta(&format!("doc-{i}"), &format!("hash-{i}")))
        .collect();
    store.upsert(vectors.clone(), metas).await.unwrap();

    for trial in 0..5 {
        let query = rng.vector(dim);
        let k = 1 + trial * 7;
        let results = store.search(&query, k).await.unwrap();
        assert_eq!(results.len(), k);

        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score, "scores must be non-increasing");
        }

        let mut expected: Vec<(usize, f32)> = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, brute_force_cosine(&query, v)))
            .collect();
        expected.sort_by(|a, b| b.1.total_cmp(&a.1));
        let expected_ids: HashSet<String> = expected[..k]
            .iter()
            .map(|(i, _)| format!("doc-{i}"))
            .collect();
        let got_ids: HashSet<String> = ids(&results).into_iter().collect();
        assert_eq!(got_ids, expected_ids, "trial {trial}, k = {k}");
    }
}

#[tokio::test]
async fn repeated_search_is_served_from_cache() {
    let store = abc_store().await;
    let query = [0.7, 0.3, 0.0, 0.0];

    let first = store.search(&query, 2).await.unwrap();
    assert_eq!(store.cached_queries().await, 1);
    let second = store.search(&query, 2).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.cached_queries().await, 1);

    store.search(&query, 3).await.unwrap();
    assert_eq!(store.cached_queries().await, 2, "k is part of the key");
}

#[tokio::test]
async fn upsert_invalidates_cache() {
    let store = abc_store().await;
    let query = [0.0, 0.0, 1.0, 0.0];

    let before = store.search(&query, 1).await.unwrap();
    assert_ne!(ids(&before), vec!["D"]);

    store
        .upsert(vec![vec![0.0, 0.0, 1.0, 0.0]], vec![meta("D", "h4")])
        .await
        .unwrap();
    assert_eq!(store.cached_queries().await, 0);

    let after = store.search(&query, 1).await.unwrap();
    assert_eq!(ids(&after), vec!["D"]);
}

#[tokio::test]
async fn no_op_upsert_keeps_cache() {
    let store = abc_store().await;
    store.search(&[1.0, 0.0, 0.0, 0.0], 1).await.unwrap();

    store
        .upsert(vec![vec![1.0, 0.0, 0.0, 0.0]], vec![meta("A", "h1")])
        .await
        .unwrap();
    assert_eq!(store.cached_queries().await, 1);
}

#[tokio::test]
async fn expired_cache_entries_are_recomputed() {
    let store =
        InMemoryVectorStore::with_cache_config(2, CacheConfig::new(Duration::from_millis(30), 8));
    store
        .upsert(vec![vec![1.0, 0.0]], vec![meta("x", "hx")])
        .await
        .unwrap();
    store.search(&[1.0, 0.0], 1).await.unwrap();
    assert_eq!(store.cached_queries().await, 1);

    tokio::time::sleep(Duration::from_millis(60)).await;

    let results = store.search(&[1.0, 0.0], 1).await.unwrap();
    assert_eq!(ids(&results), vec!["x"]);
    assert_eq!(store.cached_queries().await, 1, "stale entry replaced, not accumulated");
}

#[tokio::test]
async fn preserves_caller_metadata() {
    let store = InMemoryVectorStore::new(2);
    let record = meta("doc", "hd")
        .with_field("section", "Refunds")
        .with_field("tags", json!(["returns", "policy"]));
    store
        .upsert(vec![vec![0.5, 0.5]], vec![record.clone()])
        .await
        .unwrap();

    let results = store.search(&[0.5, 0.5], 1).await.unwrap();
    assert_eq!(results[0].metadata, record);
}

#[tokio::test]
async fn reports_kind_and_health() {
    let store = InMemoryVectorStore::new(8);
    assert_eq!(store.kind(), BackendKind::InMemory);
    assert!(store.health().healthy);
    assert_eq!(store.dimension(), 8);
}
