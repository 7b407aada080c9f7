//! Batch evaluation coverage: equivalence with sequential evaluation and
//! independence between entities in one call.

use std::sync::Arc;
use std::time::Duration;

use hallgate::cache::AccessCache;
use hallgate::directory::memory::{InMemoryDirectory, InMemoryPermissions};
use hallgate::engine::{AccessEngine, EvaluateOptions};
use hallgate::policy::{catalog, PolicyRegistry};
use hallgate::types::Principal;

async fn seeded_engine() -> (AccessEngine, Arc<InMemoryDirectory>) {
    let registry = Arc::new(PolicyRegistry::new());
    catalog::register_defaults(&registry).expect("catalog");
    let directory = Arc::new(InMemoryDirectory::new());
    directory.add_contact("c-1", "maria@example.com").await;
    directory.add_worker("w-1", "c-1").await;
    directory.add_worker("w-2", "c-other").await;
    directory.add_worker("w-3", "c-1").await;
    let engine = AccessEngine::new(
        registry,
        Arc::new(AccessCache::new(100, Duration::from_secs(60))),
        Arc::new(InMemoryPermissions::new()),
        Arc::clone(&directory) as Arc<dyn hallgate::directory::Directory>,
        "admin.full",
    );
    (engine, directory)
}

fn member() -> Principal {
    Principal::new("u-member", "maria@example.com")
}

#[tokio::test]
async fn batch_matches_sequential_evaluation() {
    let (engine, _dir) = seeded_engine().await;
    let ids: Vec<String> = ["w-1", "w-2", "w-3", "w-missing"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect();

    let batch = engine
        .evaluate_batch(&member(), "worker.view", &ids, EvaluateOptions::default())
        .await
        .expect("batch");

    for id in &ids {
        let sequential = engine
            .evaluate(&member(), "worker.view", id, EvaluateOptions { skip_cache: true })
            .await
            .expect("evaluate");
        let batched = batch.get(id).expect("batch result present");
        assert_eq!(batched.granted, sequential.granted, "entity: {id}");
    }
}

#[tokio::test]
async fn batch_results_are_independent() {
    let (engine, _dir) = seeded_engine().await;
    let ids = vec!["w-1".to_owned(), "w-2".to_owned()];

    let batch = engine
        .evaluate_batch(&member(), "worker.view", &ids, EvaluateOptions::default())
        .await
        .expect("batch");

    assert!(batch["w-1"].granted);
    assert!(!batch["w-2"].granted);
}

#[tokio::test]
async fn empty_batch_returns_empty_map() {
    let (engine, _dir) = seeded_engine().await;

    let batch = engine
        .evaluate_batch(&member(), "worker.view", &[], EvaluateOptions::default())
        .await
        .expect("batch");
    assert!(batch.is_empty());
}

#[tokio::test]
async fn batch_reuses_cached_decisions() {
    let (engine, directory) = seeded_engine().await;
    let ids = vec!["w-1".to_owned(), "w-2".to_owned()];

    engine
        .evaluate_batch(&member(), "worker.view", &ids, EvaluateOptions::default())
        .await
        .expect("batch");
    let lookups_after_first = directory.lookup_count();

    engine
        .evaluate_batch(&member(), "worker.view", &ids, EvaluateOptions::default())
        .await
        .expect("batch");
    assert_eq!(directory.lookup_count(), lookups_after_first);
}

#[tokio::test]
async fn batch_with_unknown_policy_denies_every_entity() {
    let (engine, _dir) = seeded_engine().await;
    let ids = vec!["w-1".to_owned(), "w-2".to_owned()];

    let batch = engine
        .evaluate_batch(&member(), "ghost.view", &ids, EvaluateOptions::default())
        .await
        .expect("batch");

    assert_eq!(batch.len(), 2);
    assert!(batch.values().all(|r| !r.granted));
}
