use crate::error::{WeyloError, WeyloResult};
use crate::models::{NewReport, ReportReason};

pub const DEFAULT_MIN_CONFESSION_LEN: usize = 10;
pub const DEFAULT_MIN_COMMENT_LEN: usize = 2;
pub const MAX_CONTENT_LEN: usize = 2000;
pub const MAX_REPORT_DESCRIPTION_LEN: usize = 500;

/// Local preconditions checked before any optimistic write or network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRules {
    pub min_confession_len: usize,
    pub min_comment_len: usize,
}

impl Default for ContentRules {
    fn default() -> Self {
        Self { min_confession_len: DEFAULT_MIN_CONFESSION_LEN, min_comment_len: DEFAULT_MIN_COMMENT_LEN }
    }
}

impl ContentRules {
    /// Returns the trimmed content to send.
    pub fn confession(&self, content: &str) -> WeyloResult<String> {
        check_length("confession", content, self.min_confession_len)
    }

    pub fn comment(&self, content: &str) -> WeyloResult<String> {
        check_length("comment", content, self.min_comment_len)
    }
}

fn check_length(what: &str, content: &str, min: usize) -> WeyloResult<String> {
    let trimmed = content.trim();
    let len = trimmed.chars().count();
    if len < min {
        return Err(WeyloError::Validation(format!("{what} must be at least {min} characters")));
    }
    if len > MAX_CONTENT_LEN {
        return Err(WeyloError::Validation(format!("{what} must be at most {MAX_CONTENT_LEN} characters")));
    }
    Ok(trimmed.to_string())
}

/// `Other` needs a description; descriptions are bounded.
pub fn report(reason: ReportReason, description: Option<&str>) -> WeyloResult<NewReport> {
    let description = description.map(str::trim).filter(|d| !d.is_empty());
    if reason == ReportReason::Other && description.is_none() {
        return Err(WeyloError::Validation("describe the problem when reporting for another reason".into()));
    }
    if let Some(d) = description {
        if d.chars().count() > MAX_REPORT_DESCRIPTION_LEN {
            return Err(WeyloError::Validation(format!(
                "description must be at most {MAX_REPORT_DESCRIPTION_LEN} characters"
            )));
        }
    }
    Ok(NewReport { reason, description: description.map(str::to_string) })
}
