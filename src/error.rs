use std::fmt;

use thiserror::Error;

use crate::models::Id;
use crate::store::StoreError;

/// Failure of a single remote operation. Never retried by the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("decode: {0}")]
    Decode(String),
}

impl RemoteError {
    /// True when the request never produced an HTTP response.
    pub fn is_transport(&self) -> bool {
        matches!(self, RemoteError::Transport(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Confession,
    Comment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Confession => f.write_str("confession"),
            EntityKind::Comment => f.write_str("comment"),
        }
    }
}

#[derive(Error, Debug)]
pub enum WeyloError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Id },
    #[error("remote: {0}")]
    Remote(#[from] RemoteError),
    #[error("authentication required")]
    AuthRequired,
    #[error("cancelled")]
    Cancelled,
    #[error("declined")]
    Declined,
}

impl From<StoreError> for WeyloError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { kind, id } => WeyloError::NotFound { kind, id },
        }
    }
}

pub type WeyloResult<T> = Result<T, WeyloError>;
