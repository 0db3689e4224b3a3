//! Optimistic mutation lifecycle.
//!
//! Every like, unlike, comment add and comment delete goes through the same
//! steps: capture the current stored state, apply the local delta, issue one
//! remote call, then either keep the local result or reload the affected
//! entities from the server. Local deltas are never inverted: other mutations
//! may have landed in between, so only a reload is known to be correct.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::dialog::{AutoConfirm, Confirmer, Notice, Notifier, TracingNotifier};
use crate::error::{EntityKind, RemoteError, RemoteResult, WeyloError, WeyloResult};
use crate::models::*;
use crate::remote::{Operation, RemoteClient};
use crate::session::Session;
use crate::store::EntityStore;
use crate::telemetry;
use crate::validation::{self, ContentRules};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Like,
    Unlike,
    AddComment,
    DeleteComment,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        self.operation().as_str()
    }

    pub fn operation(&self) -> Operation {
        match self {
            MutationKind::Like => Operation::Like,
            MutationKind::Unlike => Operation::Unlike,
            MutationKind::AddComment => Operation::AddComment,
            MutationKind::DeleteComment => Operation::DeleteComment,
        }
    }

    fn touches_comments(&self) -> bool {
        matches!(self, MutationKind::AddComment | MutationKind::DeleteComment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Idle,
    Applied,
    Confirmed,
    RolledBack,
    /// The owning view was cancelled before the remote call resolved.
    Discarded,
}

impl MutationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationState::Idle => "idle",
            MutationState::Applied => "applied",
            MutationState::Confirmed => "confirmed",
            MutationState::RolledBack => "rolled_back",
            MutationState::Discarded => "discarded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MutationState::Confirmed | MutationState::RolledBack | MutationState::Discarded)
    }

    /// Idle -> Applied -> {Confirmed | RolledBack | Discarded}
    pub fn can_advance_to(&self, next: MutationState) -> bool {
        matches!(
            (self, next),
            (MutationState::Idle, MutationState::Applied)
                | (
                    MutationState::Applied,
                    MutationState::Confirmed | MutationState::RolledBack | MutationState::Discarded
                )
        )
    }
}

/// An in-flight optimistic change.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub id: Uuid,
    pub kind: MutationKind,
    pub target: Id,
    pub comment_id: Option<Id>,
    pub patch: ConfessionPatch,
    pub state: MutationState,
    pub started_at: DateTime<Utc>,
}

impl PendingMutation {
    fn new(kind: MutationKind, target: Id, patch: ConfessionPatch) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            target,
            comment_id: None,
            patch,
            state: MutationState::Idle,
            started_at: Utc::now(),
        }
    }

    fn advance(&mut self, next: MutationState) {
        if self.state.can_advance_to(next) {
            debug!(mutation = %self.id, kind = self.kind.as_str(), from = self.state.as_str(), to = next.as_str(), "mutation state");
            self.state = next;
        } else {
            warn!(mutation = %self.id, from = self.state.as_str(), to = next.as_str(), "ignored invalid mutation transition");
        }
    }
}

type Turns = DashMap<Id, Arc<Mutex<()>>>;

/// Exclusive access to one entity while serialization is on. The slot is
/// dropped from the map once nobody holds or waits for it.
struct Turn<'a> {
    id: Id,
    turns: &'a Turns,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<'a> Turn<'a> {
    async fn acquire(turns: &'a Turns, id: Id) -> Turn<'a> {
        let slot = Arc::clone(&turns.entry(id).or_default());
        let guard = slot.lock_owned().await;
        Turn { id, turns, guard: Some(guard) }
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        // the guard holds its own clone of the slot
        drop(self.guard.take());
        self.turns.remove_if(&self.id, |_, slot| Arc::strong_count(slot) == 1);
    }
}

pub struct Reconciler {
    store: Arc<EntityStore>,
    client: Arc<dyn RemoteClient>,
    session: Session,
    rules: ContentRules,
    confirmer: Arc<dyn Confirmer>,
    notifier: Arc<dyn Notifier>,
    cancel: CancellationToken,
    serialize: bool,
    turns: Turns,
    inflight: DashMap<Uuid, PendingMutation>,
}

impl Reconciler {
    /// Gated actions are declined unless a confirmer is supplied.
    pub fn new(store: Arc<EntityStore>, client: Arc<dyn RemoteClient>, session: Session) -> Self {
        Self {
            store,
            client,
            session,
            rules: ContentRules::default(),
            confirmer: Arc::new(AutoConfirm(false)),
            notifier: Arc::new(TracingNotifier),
            cancel: CancellationToken::new(),
            serialize: false,
            turns: DashMap::new(),
            inflight: DashMap::new(),
        }
    }

    pub fn from_config(config: &ClientConfig, store: Arc<EntityStore>, client: Arc<dyn RemoteClient>) -> Self {
        Self::new(store, client, config.session())
            .with_rules(config.rules())
            .serialize_per_entity(config.serialize_mutations)
    }

    pub fn with_rules(mut self, rules: ContentRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_confirmer(mut self, confirmer: Arc<dyn Confirmer>) -> Self {
        self.confirmer = confirmer;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Bind to the owning view's lifetime. Results arriving after cancellation are dropped.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Queue mutations on the same entity instead of letting them race.
    pub fn serialize_per_entity(mut self, enabled: bool) -> Self {
        self.serialize = enabled;
        self
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn pending(&self) -> Vec<PendingMutation> {
        self.inflight.iter().map(|m| m.value().clone()).collect()
    }

    // ---------------- reads -------------------------------------------

    /// Overwrite the stored confession with the server's copy.
    pub async fn refresh_confession(&self, id: Id) -> WeyloResult<Confession> {
        match self.remote(self.client.get_confession(id)).await {
            None => Err(WeyloError::Cancelled),
            Some(Ok(c)) => {
                self.store.upsert(c.clone());
                Ok(c)
            }
            Some(Err(RemoteError::Status { status: 404, .. })) => {
                self.store.remove(id);
                Err(WeyloError::NotFound { kind: EntityKind::Confession, id })
            }
            Some(Err(e)) => Err(e.into()),
        }
    }

    /// Replace the stored comment list with the server's.
    pub async fn load_comments(&self, confession_id: Id) -> WeyloResult<Vec<Comment>> {
        match self.remote(self.client.list_comments(confession_id)).await {
            None => Err(WeyloError::Cancelled),
            Some(Ok(list)) => {
                self.store.set_comments(confession_id, list.clone());
                Ok(list)
            }
            Some(Err(e)) => Err(e.into()),
        }
    }

    // ---------------- optimistic mutations ----------------------------

    pub async fn like(&self, id: Id) -> WeyloResult<Confession> {
        self.reconcile_like(id, Some(true)).await
    }

    pub async fn unlike(&self, id: Id) -> WeyloResult<Confession> {
        self.reconcile_like(id, Some(false)).await
    }

    /// Like or unlike depending on the stored state at the moment of the call.
    pub async fn toggle_like(&self, id: Id) -> WeyloResult<Confession> {
        self.reconcile_like(id, None).await
    }

    async fn reconcile_like(&self, id: Id, want: Option<bool>) -> WeyloResult<Confession> {
        self.authorize()?;
        let _turn = self.turn(id).await;

        // capture and apply against the latest stored state in one step
        let applied = self.store.update(id, |c| {
            let next = want.unwrap_or(!c.is_liked);
            if c.is_liked == next {
                return None;
            }
            let patch = ConfessionPatch::like(next);
            patch.apply(c);
            Some((next, patch, c.clone()))
        });
        let (liked, patch, snapshot) = match applied {
            Ok(Some(v)) => v,
            Ok(None) => return Ok(self.store.get(id)?),
            Err(e) => {
                debug!(confession = id, "like target not in store");
                return Err(e.into());
            }
        };

        let kind = if liked { MutationKind::Like } else { MutationKind::Unlike };
        let mut record = PendingMutation::new(kind, id, patch);
        self.begin(&mut record);

        let call = if liked { self.client.like(id) } else { self.client.unlike(id) };
        match self.remote(call).await {
            None => Err(self.discard(&mut record)),
            Some(Ok(())) => {
                self.settle(&mut record, MutationState::Confirmed);
                Ok(self.store.get(id).unwrap_or(snapshot))
            }
            Some(Err(e)) => Err(self.roll_back(&mut record, e).await),
        }
    }

    pub async fn add_comment(&self, confession_id: Id, content: &str, anonymous: bool) -> WeyloResult<Comment> {
        self.authorize()?;
        let content = self.rules.comment(content).map_err(|e| self.reject(e))?;
        let _turn = self.turn(confession_id).await;

        let mut record = PendingMutation::new(MutationKind::AddComment, confession_id, ConfessionPatch::comments(1));
        self.store.patch(confession_id, &record.patch)?;
        self.store.push_comment(Comment {
            id: 0,
            confession_id,
            content: content.clone(),
            author: if anonymous { None } else { self.session.profile().cloned() },
            is_anonymous: anonymous,
            is_mine: true,
            created_at: Utc::now(),
            pending: Some(record.id),
        });
        self.begin(&mut record);

        let new = NewComment { content, is_anonymous: anonymous };
        match self.remote(self.client.add_comment(confession_id, new)).await {
            None => Err(self.discard(&mut record)),
            Some(Ok(comment)) => {
                // server owns id, timestamp and author rendering
                self.store.replace_comment(confession_id, record.id, comment.clone());
                record.comment_id = Some(comment.id);
                self.settle(&mut record, MutationState::Confirmed);
                Ok(comment)
            }
            Some(Err(e)) => Err(self.roll_back(&mut record, e).await),
        }
    }

    /// Requires an affirmative answer from the confirmer before anything changes.
    pub async fn delete_comment(&self, confession_id: Id, comment_id: Id) -> WeyloResult<()> {
        self.authorize()?;
        self.store.get(confession_id)?;
        let existing = self.store.find_comment(confession_id, comment_id)?;
        if existing.is_pending() {
            return Err(self.reject(WeyloError::Validation("comment is still being posted".into())));
        }
        if !self.confirmer.confirm("Delete this comment?").await {
            info!(confession = confession_id, comment = comment_id, "comment deletion declined");
            return Err(WeyloError::Declined);
        }
        let _turn = self.turn(confession_id).await;

        let mut record = PendingMutation::new(MutationKind::DeleteComment, confession_id, ConfessionPatch::comments(-1));
        record.comment_id = Some(comment_id);
        // either may have gone while the prompt was open
        self.store.get(confession_id)?;
        self.store.remove_comment(confession_id, comment_id)?;
        self.store.patch(confession_id, &record.patch)?;
        self.begin(&mut record);

        match self.remote(self.client.delete_comment(confession_id, comment_id)).await {
            None => Err(self.discard(&mut record)),
            Some(Ok(())) => {
                self.settle(&mut record, MutationState::Confirmed);
                Ok(())
            }
            Some(Err(e)) => Err(self.roll_back(&mut record, e).await),
        }
    }

    // ---------------- confirmed-only mutations ------------------------

    /// New confessions enter moderation; nothing is shown before the server accepts it.
    pub async fn create_confession(&self, content: &str, visibility: Visibility) -> WeyloResult<Confession> {
        self.authorize()?;
        let content = self.rules.confession(content).map_err(|e| self.reject(e))?;
        let op = Operation::CreateConfession;
        match self.remote(self.client.create_confession(NewConfession { content, visibility })).await {
            None => Err(WeyloError::Cancelled),
            Some(Ok(created)) => {
                if created.status == ConfessionStatus::Pending {
                    self.notifier.notify(Notice::info("Your confession was submitted and is awaiting moderation."));
                }
                self.store.prepend(created.clone());
                telemetry::mutation_settled(op.as_str(), MutationState::Confirmed.as_str());
                Ok(created)
            }
            Some(Err(e)) => Err(self.failed(op, None, e)),
        }
    }

    pub async fn delete_confession(&self, id: Id) -> WeyloResult<()> {
        self.authorize()?;
        self.store.get(id)?;
        if !self.confirmer.confirm("Delete this confession?").await {
            info!(confession = id, "confession deletion declined");
            return Err(WeyloError::Declined);
        }
        let _turn = self.turn(id).await;
        let op = Operation::DeleteConfession;
        match self.remote(self.client.delete_confession(id)).await {
            None => Err(WeyloError::Cancelled),
            Some(Ok(())) => {
                self.store.remove(id);
                telemetry::mutation_settled(op.as_str(), MutationState::Confirmed.as_str());
                Ok(())
            }
            Some(Err(e)) => {
                if let Err(reload) = self.refresh_confession(id).await {
                    warn!(confession = id, error = %reload, "reload after failed delete did not complete");
                }
                Err(self.failed(op, Some(id), e))
            }
        }
    }

    pub async fn report_confession(&self, id: Id, reason: ReportReason, description: Option<&str>) -> WeyloResult<()> {
        self.authorize()?;
        let report = validation::report(reason, description).map_err(|e| self.reject(e))?;
        let op = Operation::ReportConfession;
        match self.remote(self.client.report_confession(id, report)).await {
            None => Err(WeyloError::Cancelled),
            Some(Ok(())) => {
                self.notifier.notify(Notice::info("Thanks, the confession has been reported."));
                telemetry::mutation_settled(op.as_str(), MutationState::Confirmed.as_str());
                Ok(())
            }
            Some(Err(e)) => Err(self.failed(op, Some(id), e)),
        }
    }

    // ---------------- lifecycle helpers -------------------------------

    fn authorize(&self) -> WeyloResult<()> {
        self.session.require_viewer().map_err(|e| self.reject(e))
    }

    /// Local precondition failures get a notice and never reach the network.
    fn reject(&self, err: WeyloError) -> WeyloError {
        match &err {
            WeyloError::Validation(msg) => self.notifier.notify(Notice::warning(msg.clone())),
            WeyloError::AuthRequired => self.notifier.notify(Notice::warning("Sign in to continue.")),
            _ => {}
        }
        err
    }

    async fn turn(&self, id: Id) -> Option<Turn<'_>> {
        if !self.serialize {
            return None;
        }
        Some(Turn::acquire(&self.turns, id).await)
    }

    async fn remote<T>(&self, call: impl Future<Output = RemoteResult<T>>) -> Option<RemoteResult<T>> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            res = call => {
                if self.cancel.is_cancelled() { None } else { Some(res) }
            }
        }
    }

    fn begin(&self, record: &mut PendingMutation) {
        record.advance(MutationState::Applied);
        self.inflight.insert(record.id, record.clone());
    }

    fn settle(&self, record: &mut PendingMutation, state: MutationState) {
        record.advance(state);
        self.inflight.remove(&record.id);
        telemetry::mutation_settled(record.kind.as_str(), state.as_str());
    }

    fn discard(&self, record: &mut PendingMutation) -> WeyloError {
        debug!(kind = record.kind.as_str(), confession = record.target, "view cancelled, result discarded");
        self.settle(record, MutationState::Discarded);
        WeyloError::Cancelled
    }

    async fn roll_back(&self, record: &mut PendingMutation, err: RemoteError) -> WeyloError {
        error!(kind = record.kind.as_str(), confession = record.target, reason = %err, "mutation failed, reloading from server");
        if let Err(e) = self.refresh_confession(record.target).await {
            warn!(confession = record.target, error = %e, "reload after failed mutation did not complete");
        }
        if record.kind.touches_comments() {
            if let Err(e) = self.load_comments(record.target).await {
                warn!(confession = record.target, error = %e, "comment reload after failed mutation did not complete");
            }
        }
        self.settle(record, MutationState::RolledBack);
        self.notifier.notify(Notice::failure());
        WeyloError::Remote(err)
    }

    fn failed(&self, op: Operation, entity: Option<Id>, err: RemoteError) -> WeyloError {
        error!(kind = op.as_str(), ?entity, reason = %err, "mutation failed");
        telemetry::mutation_settled(op.as_str(), "failed");
        self.notifier.notify(Notice::failure());
        WeyloError::Remote(err)
    }
}
