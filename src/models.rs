use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Id = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Id,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Whether the author identity is revealed on a confession.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Anonymous,
    Public,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfessionStatus {
    Pending,
    #[default]
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confession {
    pub id: Id,
    pub content: String,
    #[serde(default)]
    pub author: Option<Author>, // only present when visibility reveals it
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub status: ConfessionStatus,
    #[serde(default)]
    pub is_liked: bool, // viewer-relative
    #[serde(default)]
    pub is_mine: bool,
    #[serde(default)]
    pub likes_count: u32,
    #[serde(default)]
    pub comments_count: u32, // server counter, may drift from the loaded list
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Id,
    pub confession_id: Id,
    pub content: String,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub is_mine: bool,
    pub created_at: DateTime<Utc>,
    /// Set on optimistic placeholders until the server returns the canonical comment.
    #[serde(skip)]
    pub pending: Option<Uuid>,
}

impl Comment {
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConfession {
    pub content: String,
    #[serde(rename = "type")]
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub content: String,
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    Spam,
    Harassment,
    HateSpeech,
    Inappropriate,
    Other,
}

impl std::str::FromStr for ReportReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spam" => Ok(ReportReason::Spam),
            "harassment" => Ok(ReportReason::Harassment),
            "hate_speech" | "hate-speech" => Ok(ReportReason::HateSpeech),
            "inappropriate" => Ok(ReportReason::Inappropriate),
            "other" => Ok(ReportReason::Other),
            other => Err(format!("unknown report reason '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReport {
    pub reason: ReportReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Pagination metadata as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total: u64,
}

impl PageMeta {
    pub fn has_more(&self) -> bool {
        self.current_page < self.last_page
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

/// `{"data": ...}` wrapper used by single-resource responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Partial update applied to a stored confession.
///
/// Liking goes through `is_liked` only: the counter follows the flag, so the
/// two can never be written independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfessionPatch {
    pub is_liked: Option<bool>,
    pub comments_delta: i32,
}

impl ConfessionPatch {
    pub fn like(liked: bool) -> Self {
        Self { is_liked: Some(liked), ..Default::default() }
    }

    pub fn comments(delta: i32) -> Self {
        Self { comments_delta: delta, ..Default::default() }
    }

    pub fn apply(&self, c: &mut Confession) {
        if let Some(liked) = self.is_liked {
            if c.is_liked != liked {
                c.is_liked = liked;
                c.likes_count = if liked {
                    c.likes_count.saturating_add(1)
                } else {
                    c.likes_count.saturating_sub(1)
                };
            }
        }
        if self.comments_delta != 0 {
            c.comments_count = c.comments_count.saturating_add_signed(self.comments_delta);
        }
    }
}
