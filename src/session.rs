use crate::error::{WeyloError, WeyloResult};
use crate::models::Author;

/// The signed-in viewer, if any. Mutations require one.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
    viewer: Option<Author>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: Some(token.into()), viewer: None }
    }

    /// Attach the viewer profile used to render optimistic comments.
    pub fn viewer(mut self, viewer: Author) -> Self {
        self.viewer = Some(viewer);
        self
    }

    pub fn profile(&self) -> Option<&Author> {
        self.viewer.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn require_viewer(&self) -> WeyloResult<()> {
        if self.is_authenticated() { Ok(()) } else { Err(WeyloError::AuthRequired) }
    }
}
