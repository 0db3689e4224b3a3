use async_trait::async_trait;
use dashmap::DashMap;
use tracing::warn;

use crate::error::{RemoteError, RemoteResult};
use crate::models::*;
use crate::remote::{CommentApi, ConfessionApi, RemoteClient};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ReadKey {
    Page { page: u32, per_page: u32 },
    Confession(Id),
    Comments(Id),
}

#[derive(Debug, Clone)]
enum Cached {
    Page(Page<Confession>),
    Confession(Confession),
    Comments(Vec<Comment>),
}

/// Network-first reads with a last-good-response fallback.
///
/// Reads always go to the network. A successful response is remembered; if a
/// later identical read fails at the transport level the remembered response
/// is served instead. Server errors are passed through untouched, as are all
/// mutations (which also invalidate what they touch).
pub struct NetworkFirst<C> {
    inner: C,
    entries: DashMap<ReadKey, Cached>,
}

impl<C: RemoteClient> NetworkFirst<C> {
    pub fn new(inner: C) -> Self {
        Self { inner, entries: DashMap::new() }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn cached_len(&self) -> usize {
        self.entries.len()
    }

    fn fallback<T>(&self, key: &ReadKey, err: RemoteError, pick: impl Fn(&Cached) -> Option<T>) -> RemoteResult<T> {
        if !err.is_transport() {
            return Err(err);
        }
        match self.entries.get(key).and_then(|c| pick(c.value())) {
            Some(v) => {
                warn!(?key, error = %err, "network unavailable, serving cached response");
                Ok(v)
            }
            None => Err(err),
        }
    }

    fn invalidate(&self, id: Id) {
        self.entries.remove(&ReadKey::Confession(id));
        self.entries.remove(&ReadKey::Comments(id));
    }
}

#[async_trait]
impl<C: RemoteClient> ConfessionApi for NetworkFirst<C> {
    async fn list_confessions(&self, page: u32, per_page: u32) -> RemoteResult<Page<Confession>> {
        let key = ReadKey::Page { page, per_page };
        match self.inner.list_confessions(page, per_page).await {
            Ok(p) => {
                self.entries.insert(key, Cached::Page(p.clone()));
                Ok(p)
            }
            Err(e) => self.fallback(&key, e, |c| match c { Cached::Page(p) => Some(p.clone()), _ => None }),
        }
    }
    async fn get_confession(&self, id: Id) -> RemoteResult<Confession> {
        let key = ReadKey::Confession(id);
        match self.inner.get_confession(id).await {
            Ok(c) => {
                self.entries.insert(key, Cached::Confession(c.clone()));
                Ok(c)
            }
            Err(e) => self.fallback(&key, e, |c| match c { Cached::Confession(c) => Some(c.clone()), _ => None }),
        }
    }
    async fn like(&self, id: Id) -> RemoteResult<()> {
        let res = self.inner.like(id).await;
        if res.is_ok() { self.invalidate(id); }
        res
    }
    async fn unlike(&self, id: Id) -> RemoteResult<()> {
        let res = self.inner.unlike(id).await;
        if res.is_ok() { self.invalidate(id); }
        res
    }
    async fn create_confession(&self, new: NewConfession) -> RemoteResult<Confession> {
        self.inner.create_confession(new).await
    }
    async fn delete_confession(&self, id: Id) -> RemoteResult<()> {
        let res = self.inner.delete_confession(id).await;
        if res.is_ok() {
            self.invalidate(id);
            // pages may still list it
            self.entries.retain(|k, _| !matches!(k, ReadKey::Page { .. }));
        }
        res
    }
    async fn report_confession(&self, id: Id, report: NewReport) -> RemoteResult<()> {
        self.inner.report_confession(id, report).await
    }
}

#[async_trait]
impl<C: RemoteClient> CommentApi for NetworkFirst<C> {
    async fn list_comments(&self, confession_id: Id) -> RemoteResult<Vec<Comment>> {
        let key = ReadKey::Comments(confession_id);
        match self.inner.list_comments(confession_id).await {
            Ok(v) => {
                self.entries.insert(key, Cached::Comments(v.clone()));
                Ok(v)
            }
            Err(e) => self.fallback(&key, e, |c| match c { Cached::Comments(v) => Some(v.clone()), _ => None }),
        }
    }
    async fn add_comment(&self, confession_id: Id, new: NewComment) -> RemoteResult<Comment> {
        let res = self.inner.add_comment(confession_id, new).await;
        if res.is_ok() { self.invalidate(confession_id); }
        res
    }
    async fn delete_comment(&self, confession_id: Id, comment_id: Id) -> RemoteResult<()> {
        let res = self.inner.delete_comment(confession_id, comment_id).await;
        if res.is_ok() { self.invalidate(confession_id); }
        res
    }
}
