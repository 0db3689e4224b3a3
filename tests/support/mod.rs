#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use weylo::dialog::{Notice, NoticeLevel, Notifier};
use weylo::error::{RemoteError, RemoteResult};
use weylo::models::*;
use weylo::remote::{CommentApi, ConfessionApi, Operation};

/// In-memory stand-in for the Weylo API. Its state is the source of truth.
/// Every call yields once before answering so concurrent callers interleave.
#[derive(Default)]
pub struct FakeApi {
    confessions: Mutex<Vec<Confession>>,
    comments: Mutex<HashMap<Id, Vec<Comment>>>,
    next_id: AtomicUsize,
    calls: Mutex<Vec<Operation>>,
    failing: Mutex<HashSet<Operation>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::owned())
    }

    /// For wrapping in a decorator that takes the client by value.
    pub fn owned() -> Self {
        Self { next_id: AtomicUsize::new(1000), ..Default::default() }
    }

    pub fn seed(&self, c: Confession) {
        let mut all = self.confessions.lock().unwrap();
        all.retain(|x| x.id != c.id);
        all.push(c);
    }

    pub fn fail(&self, op: Operation) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: Operation) {
        self.failing.lock().unwrap().remove(&op);
    }

    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: Operation) -> usize {
        self.calls().into_iter().filter(|c| *c == op).count()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn server_confession(&self, id: Id) -> Option<Confession> {
        self.confessions.lock().unwrap().iter().find(|c| c.id == id).cloned()
    }

    pub fn server_comments(&self, id: Id) -> Vec<Comment> {
        self.comments.lock().unwrap().get(&id).cloned().unwrap_or_default()
    }

    async fn enter(&self, op: Operation) -> RemoteResult<()> {
        self.calls.lock().unwrap().push(op);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&op) {
            return Err(RemoteError::Transport("connection reset".into()));
        }
        Ok(())
    }

    fn with_confession<T>(&self, id: Id, f: impl FnOnce(&mut Confession) -> T) -> RemoteResult<T> {
        let mut all = self.confessions.lock().unwrap();
        let c = all
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RemoteError::Status { status: 404, message: "Not Found".into() })?;
        Ok(f(c))
    }
}

#[async_trait]
impl ConfessionApi for FakeApi {
    async fn list_confessions(&self, page: u32, per_page: u32) -> RemoteResult<Page<Confession>> {
        self.enter(Operation::ListConfessions).await?;
        let all = self.confessions.lock().unwrap();
        let per = per_page.max(1) as usize;
        let last_page = ((all.len() + per - 1) / per).max(1) as u32;
        let data = all.iter().skip((page.saturating_sub(1)) as usize * per).take(per).cloned().collect();
        Ok(Page {
            data,
            meta: PageMeta { current_page: page, last_page, per_page, total: all.len() as u64 },
        })
    }
    async fn get_confession(&self, id: Id) -> RemoteResult<Confession> {
        self.enter(Operation::GetConfession).await?;
        self.with_confession(id, |c| c.clone())
    }
    async fn like(&self, id: Id) -> RemoteResult<()> {
        self.enter(Operation::Like).await?;
        self.with_confession(id, |c| {
            if !c.is_liked {
                c.is_liked = true;
                c.likes_count += 1;
            }
        })
    }
    async fn unlike(&self, id: Id) -> RemoteResult<()> {
        self.enter(Operation::Unlike).await?;
        self.with_confession(id, |c| {
            if c.is_liked {
                c.is_liked = false;
                c.likes_count = c.likes_count.saturating_sub(1);
            }
        })
    }
    async fn create_confession(&self, new: NewConfession) -> RemoteResult<Confession> {
        self.enter(Operation::CreateConfession).await?;
        let c = Confession {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) as Id,
            content: new.content,
            author: None,
            visibility: new.visibility,
            status: ConfessionStatus::Pending,
            is_liked: false,
            is_mine: true,
            likes_count: 0,
            comments_count: 0,
            created_at: Utc::now(),
        };
        self.seed(c.clone());
        Ok(c)
    }
    async fn delete_confession(&self, id: Id) -> RemoteResult<()> {
        self.enter(Operation::DeleteConfession).await?;
        self.with_confession(id, |_| ())?;
        self.confessions.lock().unwrap().retain(|c| c.id != id);
        Ok(())
    }
    async fn report_confession(&self, id: Id, _report: NewReport) -> RemoteResult<()> {
        self.enter(Operation::ReportConfession).await?;
        self.with_confession(id, |_| ())
    }
}

#[async_trait]
impl CommentApi for FakeApi {
    async fn list_comments(&self, confession_id: Id) -> RemoteResult<Vec<Comment>> {
        self.enter(Operation::ListComments).await?;
        Ok(self.server_comments(confession_id))
    }
    async fn add_comment(&self, confession_id: Id, new: NewComment) -> RemoteResult<Comment> {
        self.enter(Operation::AddComment).await?;
        self.with_confession(confession_id, |c| c.comments_count += 1)?;
        let comment = Comment {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) as Id,
            confession_id,
            content: new.content,
            author: None,
            is_anonymous: new.is_anonymous,
            is_mine: true,
            created_at: Utc::now(),
            pending: None,
        };
        self.comments.lock().unwrap().entry(confession_id).or_default().push(comment.clone());
        Ok(comment)
    }
    async fn delete_comment(&self, confession_id: Id, comment_id: Id) -> RemoteResult<()> {
        self.enter(Operation::DeleteComment).await?;
        self.with_confession(confession_id, |c| c.comments_count = c.comments_count.saturating_sub(1))?;
        if let Some(list) = self.comments.lock().unwrap().get_mut(&confession_id) {
            list.retain(|c| c.id != comment_id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn count(&self, level: NoticeLevel) -> usize {
        self.notices().iter().filter(|n| n.level == level).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub fn confession(id: Id, likes: u32, liked: bool) -> Confession {
    Confession {
        id,
        content: format!("confession {id}: I still sleep with a night light"),
        author: None,
        visibility: Visibility::Anonymous,
        status: ConfessionStatus::Approved,
        is_liked: liked,
        is_mine: false,
        likes_count: likes,
        comments_count: 0,
        created_at: Utc::now(),
    }
}

pub fn server_comment(confession_id: Id, id: Id, content: &str) -> Comment {
    Comment {
        id,
        confession_id,
        content: content.into(),
        author: None,
        is_anonymous: true,
        is_mine: true,
        created_at: Utc::now(),
        pending: None,
    }
}

impl FakeApi {
    pub fn seed_comment(&self, comment: Comment) {
        self.comments.lock().unwrap().entry(comment.confession_id).or_default().push(comment);
    }
}
