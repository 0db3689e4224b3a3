use std::sync::{PoisonError, RwLock};

use dashmap::DashMap;
use uuid::Uuid;

use crate::error::EntityKind;
use crate::models::{Comment, Confession, ConfessionPatch, Id};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Id },
}

pub type StoreResult<T> = Result<T, StoreError>;

fn missing(id: Id) -> StoreError {
    StoreError::NotFound { kind: EntityKind::Confession, id }
}

/// Session-scoped cache of confessions and their comments.
///
/// Every method is synchronous and touches one entry at a time, so callers
/// interleaving across await points never observe a half-applied patch.
#[derive(Default)]
pub struct EntityStore {
    confessions: DashMap<Id, Confession>,
    order: RwLock<Vec<Id>>, // feed order
    comments: DashMap<Id, Vec<Comment>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Id) -> StoreResult<Confession> {
        self.confessions.get(&id).map(|c| c.clone()).ok_or(missing(id))
    }

    pub fn contains(&self, id: Id) -> bool {
        self.confessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.confessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.confessions.is_empty()
    }

    /// Confessions in feed order.
    pub fn list(&self) -> Vec<Confession> {
        let order = self.order.read().unwrap_or_else(PoisonError::into_inner);
        order
            .iter()
            .filter_map(|id| self.confessions.get(id).map(|c| c.clone()))
            .collect()
    }

    pub fn patch(&self, id: Id, delta: &ConfessionPatch) -> StoreResult<Confession> {
        self.update(id, |c| {
            delta.apply(c);
            c.clone()
        })
    }

    /// Read-modify-write under the entry lock. `f` must not call back into the store.
    pub fn update<R>(&self, id: Id, f: impl FnOnce(&mut Confession) -> R) -> StoreResult<R> {
        let mut entry = self.confessions.get_mut(&id).ok_or(missing(id))?;
        Ok(f(entry.value_mut()))
    }

    /// Insert or overwrite; new ids go to the end of the feed.
    pub fn upsert(&self, confession: Confession) {
        let id = confession.id;
        if self.confessions.insert(id, confession).is_none() {
            self.order.write().unwrap_or_else(PoisonError::into_inner).push(id);
        }
    }

    /// Insert at the head of the feed (freshly created confessions).
    pub fn prepend(&self, confession: Confession) {
        let id = confession.id;
        let mut order = self.order.write().unwrap_or_else(PoisonError::into_inner);
        order.retain(|o| *o != id);
        order.insert(0, id);
        self.confessions.insert(id, confession);
    }

    /// Append a fetched page, overwriting entries already present in place.
    /// Returns how many confessions were new.
    pub fn append_page(&self, page: Vec<Confession>) -> usize {
        let mut order = self.order.write().unwrap_or_else(PoisonError::into_inner);
        let mut added = 0;
        for c in page {
            let id = c.id;
            if self.confessions.insert(id, c).is_none() {
                order.push(id);
                added += 1;
            }
        }
        added
    }

    /// Wholesale overwrite after an authoritative reload.
    pub fn replace_all(&self, confessions: Vec<Confession>) {
        let mut order = self.order.write().unwrap_or_else(PoisonError::into_inner);
        self.confessions.clear();
        order.clear();
        for c in confessions {
            let id = c.id;
            if self.confessions.insert(id, c).is_none() {
                order.push(id);
            }
        }
        self.comments.retain(|id, _| self.confessions.contains_key(id));
    }

    pub fn remove(&self, id: Id) -> Option<Confession> {
        let removed = self.confessions.remove(&id).map(|(_, c)| c);
        self.order.write().unwrap_or_else(PoisonError::into_inner).retain(|o| *o != id);
        self.comments.remove(&id);
        removed
    }

    // ---------------- comments -----------------------------------------

    pub fn comments(&self, confession_id: Id) -> Vec<Comment> {
        self.comments.get(&confession_id).map(|v| v.clone()).unwrap_or_default()
    }

    pub fn find_comment(&self, confession_id: Id, comment_id: Id) -> StoreResult<Comment> {
        self.comments
            .get(&confession_id)
            .and_then(|v| v.iter().find(|c| c.id == comment_id).cloned())
            .ok_or(StoreError::NotFound { kind: EntityKind::Comment, id: comment_id })
    }

    pub fn set_comments(&self, confession_id: Id, comments: Vec<Comment>) {
        self.comments.insert(confession_id, comments);
    }

    pub fn push_comment(&self, comment: Comment) {
        let mut list = self.comments.entry(comment.confession_id).or_default();
        if comment.pending.is_none() && list.iter().any(|c| c.pending.is_none() && c.id == comment.id) {
            return;
        }
        list.push(comment);
    }

    /// Swap a placeholder for the server's comment. If the placeholder is gone
    /// (overwritten by a reload) the canonical comment is added unless already present.
    pub fn replace_comment(&self, confession_id: Id, placeholder: Uuid, canonical: Comment) {
        let mut list = self.comments.entry(confession_id).or_default();
        let already = list.iter().any(|c| !c.is_pending() && c.id == canonical.id);
        match list.iter().position(|c| c.pending == Some(placeholder)) {
            Some(idx) if already => {
                list.remove(idx);
            }
            Some(idx) => list[idx] = canonical,
            None if !already => list.push(canonical),
            None => {}
        }
    }

    pub fn remove_comment(&self, confession_id: Id, comment_id: Id) -> StoreResult<Comment> {
        let not_found = StoreError::NotFound { kind: EntityKind::Comment, id: comment_id };
        let mut list = self.comments.get_mut(&confession_id).ok_or(not_found.clone())?;
        let idx = list
            .iter()
            .position(|c| !c.is_pending() && c.id == comment_id)
            .ok_or(not_found)?;
        Ok(list.remove(idx))
    }
}
