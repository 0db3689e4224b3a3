use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::RemoteResult;
use crate::models::*;

/// Every remote operation the client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListConfessions,
    GetConfession,
    Like,
    Unlike,
    CreateConfession,
    DeleteConfession,
    ReportConfession,
    ListComments,
    AddComment,
    DeleteComment,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ListConfessions => "list_confessions",
            Operation::GetConfession => "get_confession",
            Operation::Like => "like",
            Operation::Unlike => "unlike",
            Operation::CreateConfession => "create_confession",
            Operation::DeleteConfession => "delete_confession",
            Operation::ReportConfession => "report_confession",
            Operation::ListComments => "list_comments",
            Operation::AddComment => "add_comment",
            Operation::DeleteComment => "delete_comment",
        }
    }
}

// Each method is exactly one network call; nothing here retries.
#[async_trait]
pub trait ConfessionApi: Send + Sync {
    async fn list_confessions(&self, page: u32, per_page: u32) -> RemoteResult<Page<Confession>>;
    async fn get_confession(&self, id: Id) -> RemoteResult<Confession>;
    async fn like(&self, id: Id) -> RemoteResult<()>;
    async fn unlike(&self, id: Id) -> RemoteResult<()>;
    async fn create_confession(&self, new: NewConfession) -> RemoteResult<Confession>;
    async fn delete_confession(&self, id: Id) -> RemoteResult<()>;
    async fn report_confession(&self, id: Id, report: NewReport) -> RemoteResult<()>;
}

#[async_trait]
pub trait CommentApi: Send + Sync {
    async fn list_comments(&self, confession_id: Id) -> RemoteResult<Vec<Comment>>;
    async fn add_comment(&self, confession_id: Id, new: NewComment) -> RemoteResult<Comment>;
    async fn delete_comment(&self, confession_id: Id, comment_id: Id) -> RemoteResult<()>;
}

pub trait RemoteClient: ConfessionApi + CommentApi {}

impl<T> RemoteClient for T where T: ConfessionApi + CommentApi {}

/// Wraps any client and logs each operation with its latency and outcome.
pub struct LoggingClient<C> {
    inner: C,
}

impl<C: RemoteClient> LoggingClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

fn trace_outcome<T>(op: Operation, entity: Option<Id>, started: Instant, res: &RemoteResult<T>) {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match res {
        Ok(_) => debug!(op = op.as_str(), ?entity, elapsed_ms, "remote ok"),
        Err(e) => warn!(op = op.as_str(), ?entity, elapsed_ms, error = %e, "remote failed"),
    }
}

#[async_trait]
impl<C: RemoteClient> ConfessionApi for LoggingClient<C> {
    async fn list_confessions(&self, page: u32, per_page: u32) -> RemoteResult<Page<Confession>> {
        let started = Instant::now();
        let res = self.inner.list_confessions(page, per_page).await;
        trace_outcome(Operation::ListConfessions, None, started, &res);
        res
    }
    async fn get_confession(&self, id: Id) -> RemoteResult<Confession> {
        let started = Instant::now();
        let res = self.inner.get_confession(id).await;
        trace_outcome(Operation::GetConfession, Some(id), started, &res);
        res
    }
    async fn like(&self, id: Id) -> RemoteResult<()> {
        let started = Instant::now();
        let res = self.inner.like(id).await;
        trace_outcome(Operation::Like, Some(id), started, &res);
        res
    }
    async fn unlike(&self, id: Id) -> RemoteResult<()> {
        let started = Instant::now();
        let res = self.inner.unlike(id).await;
        trace_outcome(Operation::Unlike, Some(id), started, &res);
        res
    }
    async fn create_confession(&self, new: NewConfession) -> RemoteResult<Confession> {
        let started = Instant::now();
        let res = self.inner.create_confession(new).await;
        trace_outcome(Operation::CreateConfession, None, started, &res);
        res
    }
    async fn delete_confession(&self, id: Id) -> RemoteResult<()> {
        let started = Instant::now();
        let res = self.inner.delete_confession(id).await;
        trace_outcome(Operation::DeleteConfession, Some(id), started, &res);
        res
    }
    async fn report_confession(&self, id: Id, report: NewReport) -> RemoteResult<()> {
        let started = Instant::now();
        let res = self.inner.report_confession(id, report).await;
        trace_outcome(Operation::ReportConfession, Some(id), started, &res);
        res
    }
}

#[async_trait]
impl<C: RemoteClient> CommentApi for LoggingClient<C> {
    async fn list_comments(&self, confession_id: Id) -> RemoteResult<Vec<Comment>> {
        let started = Instant::now();
        let res = self.inner.list_comments(confession_id).await;
        trace_outcome(Operation::ListComments, Some(confession_id), started, &res);
        res
    }
    async fn add_comment(&self, confession_id: Id, new: NewComment) -> RemoteResult<Comment> {
        let started = Instant::now();
        let res = self.inner.add_comment(confession_id, new).await;
        trace_outcome(Operation::AddComment, Some(confession_id), started, &res);
        res
    }
    async fn delete_comment(&self, confession_id: Id, comment_id: Id) -> RemoteResult<()> {
        let started = Instant::now();
        let res = self.inner.delete_comment(confession_id, comment_id).await;
        trace_outcome(Operation::DeleteComment, Some(confession_id), started, &res);
        res
    }
}
