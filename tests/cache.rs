mod support;

use support::{confession, server_comment, FakeApi};
use weylo::{CommentApi, ConfessionApi, NetworkFirst, Operation, RemoteError};

fn cached() -> NetworkFirst<FakeApi> {
    let api = FakeApi::owned();
    for id in 1..=3 {
        api.seed(confession(id, id as u32, false));
    }
    NetworkFirst::new(api)
}

#[tokio::test]
async fn transport_failure_serves_last_good_confession() {
    let cache = cached();
    let fresh = cache.get_confession(2).await.unwrap();

    cache.inner().fail(Operation::GetConfession);
    let served = cache.get_confession(2).await.unwrap();
    assert_eq!(served, fresh);
    assert_eq!(cache.inner().count(Operation::GetConfession), 2);
}

#[tokio::test]
async fn nothing_cached_means_error() {
    let cache = cached();
    cache.inner().fail(Operation::GetConfession);

    let err = cache.get_confession(2).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(cache.cached_len(), 0);
}

#[tokio::test]
async fn server_errors_pass_through() {
    let cache = cached();
    cache.get_confession(1).await.unwrap();
    // removed behind the cache's back
    cache.inner().delete_confession(1).await.unwrap();

    let err = cache.get_confession(1).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn pages_fall_back_per_key() {
    let cache = cached();
    let first = cache.list_confessions(1, 2).await.unwrap();
    cache.inner().fail(Operation::ListConfessions);

    assert_eq!(cache.list_confessions(1, 2).await.unwrap(), first);
    let err = cache.list_confessions(2, 2).await.unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)));
}

#[tokio::test]
async fn like_invalidates_cached_confession() {
    let cache = cached();
    cache.get_confession(3).await.unwrap();
    cache.like(3).await.unwrap();

    cache.inner().fail(Operation::GetConfession);
    assert!(cache.get_confession(3).await.is_err());
}

#[tokio::test]
async fn delete_drops_cached_pages() {
    let cache = cached();
    cache.list_confessions(1, 10).await.unwrap();
    cache.get_confession(1).await.unwrap();
    assert_eq!(cache.cached_len(), 2);

    cache.delete_confession(1).await.unwrap();
    assert_eq!(cache.cached_len(), 0);
}

#[tokio::test]
async fn comment_writes_invalidate_comment_list() {
    let cache = cached();
    cache.inner().seed_comment(server_comment(1, 9, "first"));
    assert_eq!(cache.list_comments(1).await.unwrap().len(), 1);

    let added = cache
        .add_comment(1, weylo::models::NewComment { content: "second".into(), is_anonymous: true })
        .await
        .unwrap();
    assert_eq!(added.content, "second");
    assert_eq!(cache.cached_len(), 0);
    assert_eq!(cache.list_comments(1).await.unwrap().len(), 2);
}
