mod support;

use std::sync::Arc;

use support::{confession, FakeApi};
use tokio_util::sync::CancellationToken;
use weylo::{EntityStore, FeedLoader, LoadOutcome, Operation, RemoteClient, WeyloError};

fn feed(total: i64) -> (Arc<FakeApi>, Arc<EntityStore>, FeedLoader) {
    let api = FakeApi::new();
    for id in 1..=total {
        api.seed(confession(id, 0, false));
    }
    let store = Arc::new(EntityStore::new());
    let client: Arc<dyn RemoteClient> = api.clone();
    let loader = FeedLoader::new(store.clone(), client, 10);
    (api, store, loader)
}

#[tokio::test]
async fn pages_until_exhausted() {
    let (api, store, loader) = feed(25);
    assert!(loader.has_more());
    assert_eq!(loader.current_page(), None);

    assert_eq!(loader.load_more().await.unwrap(), LoadOutcome::Loaded(10));
    assert_eq!(loader.current_page(), Some(1));
    assert!(loader.has_more());

    assert_eq!(loader.load_more().await.unwrap(), LoadOutcome::Loaded(10));
    assert_eq!(loader.load_more().await.unwrap(), LoadOutcome::Loaded(5));
    assert_eq!(loader.current_page(), Some(3));
    assert!(!loader.has_more());
    assert_eq!(store.len(), 25);

    assert_eq!(loader.load_more().await.unwrap(), LoadOutcome::Exhausted);
    assert_eq!(api.count(Operation::ListConfessions), 3);
}

#[tokio::test]
async fn feed_keeps_server_order() {
    let (_api, store, loader) = feed(12);
    loader.load_more().await.unwrap();
    loader.load_more().await.unwrap();

    let ids: Vec<_> = store.list().iter().map(|c| c.id).collect();
    assert_eq!(ids, (1..=12).collect::<Vec<_>>());
}

#[tokio::test]
async fn concurrent_load_more_requests_once() {
    let (api, _store, loader) = feed(25);

    let (a, b) = tokio::join!(loader.load_more(), loader.load_more());
    assert_eq!(a.unwrap(), LoadOutcome::Loaded(10));
    assert_eq!(b.unwrap(), LoadOutcome::InFlight);
    assert_eq!(api.count(Operation::ListConfessions), 1);
    assert!(!loader.is_loading());
}

#[tokio::test]
async fn refresh_replaces_store() {
    let (_api, store, loader) = feed(15);
    store.upsert(confession(999, 1, false));

    loader.load_more().await.unwrap();
    loader.load_more().await.unwrap();
    assert!(!loader.has_more());

    assert_eq!(loader.refresh().await.unwrap(), LoadOutcome::Loaded(10));
    assert_eq!(store.len(), 10);
    assert!(!store.contains(999));
    assert_eq!(loader.current_page(), Some(1));
    assert!(loader.has_more());
}

#[tokio::test]
async fn failed_page_can_be_retried() {
    let (api, store, loader) = feed(25);
    loader.load_more().await.unwrap();

    api.fail(Operation::ListConfessions);
    let err = loader.load_more().await.unwrap_err();
    assert!(matches!(err, WeyloError::Remote(_)));
    assert_eq!(loader.current_page(), Some(1));
    assert!(loader.has_more());
    assert!(!loader.is_loading());

    api.heal(Operation::ListConfessions);
    assert_eq!(loader.load_more().await.unwrap(), LoadOutcome::Loaded(10));
    assert_eq!(loader.current_page(), Some(2));
    assert_eq!(store.len(), 20);
}

#[tokio::test]
async fn empty_feed_is_exhausted_after_first_page() {
    let (_api, store, loader) = feed(0);
    assert_eq!(loader.load_more().await.unwrap(), LoadOutcome::Loaded(0));
    assert!(!loader.has_more());
    assert!(store.is_empty());
    assert_eq!(loader.load_more().await.unwrap(), LoadOutcome::Exhausted);
}

#[tokio::test]
async fn cancelled_loader_does_not_request() {
    let (api, store, loader) = feed(25);
    let token = CancellationToken::new();
    let loader = loader.with_cancellation(token.clone());
    token.cancel();

    let err = loader.load_more().await.unwrap_err();
    assert!(matches!(err, WeyloError::Cancelled));
    assert!(api.calls().is_empty());
    assert!(store.is_empty());
}
