use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{WeyloError, WeyloResult};
use crate::models::PageMeta;
use crate::remote::RemoteClient;
use crate::store::EntityStore;
use crate::telemetry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Page fetched; carries how many confessions were new to the store.
    Loaded(usize),
    /// Another load was still running, nothing was requested.
    InFlight,
    /// The last page was already loaded, nothing was requested.
    Exhausted,
}

/// Clears the in-flight flag however the load ends.
struct LoadSlot<'a>(&'a AtomicBool);

impl<'a> LoadSlot<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LoadSlot(flag))
    }
}

impl Drop for LoadSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Loads the confession feed page by page into the entity store.
pub struct FeedLoader {
    store: Arc<EntityStore>,
    client: Arc<dyn RemoteClient>,
    page_size: u32,
    loading: AtomicBool,
    meta: Mutex<Option<PageMeta>>,
    cancel: CancellationToken,
}

impl FeedLoader {
    pub fn new(store: Arc<EntityStore>, client: Arc<dyn RemoteClient>, page_size: u32) -> Self {
        Self {
            store,
            client,
            page_size: page_size.max(1),
            loading: AtomicBool::new(false),
            meta: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn meta(&self) -> Option<PageMeta> {
        *self.meta.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True until a page reports it is the last one.
    pub fn has_more(&self) -> bool {
        self.meta().map(|m| m.has_more()).unwrap_or(true)
    }

    pub fn current_page(&self) -> Option<u32> {
        self.meta().map(|m| m.current_page)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Reload the first page and overwrite the store with it.
    pub async fn refresh(&self) -> WeyloResult<LoadOutcome> {
        self.load(1, true).await
    }

    /// Fetch the page after the last one loaded and append it.
    pub async fn load_more(&self) -> WeyloResult<LoadOutcome> {
        match self.meta() {
            None => self.load(1, true).await,
            Some(m) if !m.has_more() => {
                debug!(page = m.current_page, last = m.last_page, "feed exhausted");
                Ok(LoadOutcome::Exhausted)
            }
            Some(m) => self.load(m.current_page + 1, false).await,
        }
    }

    async fn load(&self, page: u32, replace: bool) -> WeyloResult<LoadOutcome> {
        let Some(_slot) = LoadSlot::acquire(&self.loading) else {
            debug!(page, "feed load already in flight");
            return Ok(LoadOutcome::InFlight);
        };
        let res = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(WeyloError::Cancelled),
            res = self.client.list_confessions(page, self.page_size) => res,
        };
        let fetched = match res {
            Ok(p) => p,
            Err(e) => {
                // meta untouched so the same page can be retried
                warn!(page, error = %e, "feed page failed to load");
                return Err(e.into());
            }
        };
        if self.cancel.is_cancelled() {
            return Err(WeyloError::Cancelled);
        }

        let count = fetched.data.len();
        let added = if replace {
            self.store.replace_all(fetched.data);
            count
        } else {
            self.store.append_page(fetched.data)
        };
        *self.meta.lock().unwrap_or_else(PoisonError::into_inner) = Some(fetched.meta);
        telemetry::feed_page_loaded();
        info!(page = fetched.meta.current_page, last = fetched.meta.last_page, added, "feed page loaded");
        Ok(LoadOutcome::Loaded(added))
    }
}
