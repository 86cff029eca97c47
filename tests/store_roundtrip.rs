//! Fragment store CRUD and similarity ordering against sqlite-vec.

use serde_json::json;
use tempfile::tempdir;

use policyrag::embeddings::HashEmbedder;
use policyrag::stores::sqlite::SqliteFragmentStore;
use policyrag::stores::{FragmentRecord, FragmentStore};

const DIMS: usize = 3;

fn record(id: &str, source: &str, index: usize, content: &str) -> FragmentRecord {
    FragmentRecord::new(id, source, "Policy", index, content)
        .with_metadata(json!({"source": source}))
}

async fn open_store(path: &std::path::Path) -> SqliteFragmentStore<HashEmbedder> {
    let model = HashEmbedder::new(DIMS);
    SqliteFragmentStore::open(path, &model).await.unwrap()
}

#[tokio::test]
async fn insert_fetch_delete_roundtrip() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir.path().join("store.sqlite")).await;

    let records = vec![
        record("f-1", "leave.html", 0, "Annual leave accrues monthly.")
            .with_embedding(vec![1.0, 0.0, 0.0]),
        record("f-2", "leave.html", 1, "Carryover is capped at five days.")
            .with_embedding(vec![0.0, 1.0, 0.0]),
        record("f-3", "pension.html", 0, "Six percent employer match.")
            .with_embedding(vec![0.0, 0.0, 1.0]),
    ];
    store.insert_fragments(records).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 3);

    let leave = store.fragments_by_source("leave.html").await.unwrap();
    assert_eq!(leave.len(), 2);
    assert_eq!(leave[0].fragment_index, 0);
    assert_eq!(leave[1].fragment_index, 1);
    assert_eq!(leave[0].content, "Annual leave accrues monthly.");
    assert_eq!(leave[0].metadata, json!({"source": "leave.html"}));

    let deleted = store.delete_by_source("leave.html").await.unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(store.count().await.unwrap(), 1);
    assert!(
        store
            .fragments_by_source("leave.html")
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn records_without_embeddings_are_skipped() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir.path().join("store.sqlite")).await;

    let records = vec![
        record("f-1", "a.html", 0, "embedded").with_embedding(vec![1.0, 0.0, 0.0]),
        record("f-2", "b.html", 0, "not embedded"),
    ];
    store.insert_fragments(records).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn search_orders_by_cosine_similarity() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir.path().join("store.sqlite")).await;

    let records = vec![
        record("exact", "a.html", 0, "exact direction").with_embedding(vec![1.0, 0.0, 0.0]),
        record("close", "b.html", 0, "close direction").with_embedding(vec![0.9, 0.4, 0.0]),
        record("orthogonal", "c.html", 0, "orthogonal").with_embedding(vec![0.0, 0.0, 1.0]),
    ];
    store.insert_fragments(records).await.unwrap();

    let results = store.search_similar(&[1.0, 0.0, 0.0], 2).await.unwrap();
    assert_eq!(results.len(), 2, "top_k must cap the result set");
    assert_eq!(results[0].0.id, "exact");
    assert_eq!(results[1].0.id, "close");
    assert!(results[0].1 > results[1].1, "scores must be descending");
    assert!(results[0].1 > 0.99);
}

#[tokio::test]
async fn store_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.sqlite");

    {
        let store = open_store(&path).await;
        store
            .insert_fragments(vec![
                record("f-1", "a.html", 0, "persisted").with_embedding(vec![1.0, 0.0, 0.0]),
            ])
            .await
            .unwrap();
    }

    let reopened = open_store(&path).await;
    assert_eq!(reopened.count().await.unwrap(), 1);
    let results = reopened
        .search_similar(&[1.0, 0.0, 0.0], 1)
        .await
        .unwrap();
    assert_eq!(results[0].0.content, "persisted");
}
