//! Human-in-the-loop ports.
//!
//! Gated actions ask a [`Confirmer`] before touching any state; outcomes the
//! user should see go to a [`Notifier`]. Both are passed in explicitly.

use async_trait::async_trait;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    /// The single generic message shown for failed writes.
    pub fn failure() -> Self {
        Self { level: NoticeLevel::Error, message: "Something went wrong. Please try again.".into() }
    }
}

#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Answers every prompt the same way.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        info!(prompt, answer = self.0, "auto-confirm");
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!(message = %notice.message, "notice"),
            NoticeLevel::Warning | NoticeLevel::Error => warn!(message = %notice.message, "notice"),
        }
    }
}
