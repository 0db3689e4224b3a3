use std::time::Duration;

use crate::session::Session;
use crate::validation::{ContentRules, DEFAULT_MIN_COMMENT_LEN, DEFAULT_MIN_CONFESSION_LEN};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Client settings, read from `WEYLO_*` environment variables.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub page_size: u32,
    pub timeout: Duration,
    pub min_confession_len: usize,
    pub min_comment_len: usize,
    /// Queue same-entity mutations instead of letting them race.
    pub serialize_mutations: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            page_size: DEFAULT_PAGE_SIZE,
            timeout: Duration::from_secs(15),
            min_confession_len: DEFAULT_MIN_CONFESSION_LEN,
            min_comment_len: DEFAULT_MIN_COMMENT_LEN,
            serialize_mutations: false,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        fn usize_env(name: &str, default: usize) -> usize { std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default) }
        fn bool_env(name: &str) -> bool { std::env::var(name).map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false) }
        let defaults = Self::default();
        Self {
            api_url: std::env::var("WEYLO_API_URL").unwrap_or(defaults.api_url),
            token: std::env::var("WEYLO_API_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            page_size: usize_env("WEYLO_PAGE_SIZE", DEFAULT_PAGE_SIZE as usize).clamp(1, 100) as u32,
            timeout: Duration::from_secs(usize_env("WEYLO_TIMEOUT_SECS", 15).max(1) as u64),
            min_confession_len: usize_env("WEYLO_MIN_CONFESSION_LEN", DEFAULT_MIN_CONFESSION_LEN),
            min_comment_len: usize_env("WEYLO_MIN_COMMENT_LEN", DEFAULT_MIN_COMMENT_LEN),
            serialize_mutations: bool_env("WEYLO_SERIALIZE_MUTATIONS"),
        }
    }

    pub fn rules(&self) -> ContentRules {
        ContentRules { min_confession_len: self.min_confession_len, min_comment_len: self.min_comment_len }
    }

    pub fn session(&self) -> Session {
        match &self.token {
            Some(t) => Session::with_token(t.clone()),
            None => Session::anonymous(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "WEYLO_API_URL",
        "WEYLO_API_TOKEN",
        "WEYLO_PAGE_SIZE",
        "WEYLO_TIMEOUT_SECS",
        "WEYLO_MIN_CONFESSION_LEN",
        "WEYLO_MIN_COMMENT_LEN",
        "WEYLO_SERIALIZE_MUTATIONS",
    ];

    fn clear() {
        for v in VARS { std::env::remove_var(v); }
    }

    #[test]
    #[serial]
    fn defaults_without_env() {
        clear();
        let cfg = ClientConfig::from_env();
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.page_size, 10);
        assert!(cfg.token.is_none());
        assert!(!cfg.serialize_mutations);
        assert!(!cfg.session().is_authenticated());
    }

    #[test]
    #[serial]
    fn reads_overrides() {
        clear();
        std::env::set_var("WEYLO_API_URL", "https://weylo.example/api");
        std::env::set_var("WEYLO_API_TOKEN", "abc");
        std::env::set_var("WEYLO_PAGE_SIZE", "500");
        std::env::set_var("WEYLO_MIN_COMMENT_LEN", "5");
        std::env::set_var("WEYLO_SERIALIZE_MUTATIONS", "true");
        let cfg = ClientConfig::from_env();
        clear();
        assert_eq!(cfg.api_url, "https://weylo.example/api");
        assert_eq!(cfg.page_size, 100); // clamped
        assert_eq!(cfg.rules().min_comment_len, 5);
        assert!(cfg.serialize_mutations);
        assert!(cfg.session().is_authenticated());
    }

    #[test]
    #[serial]
    fn zero_timeout_is_raised() {
        clear();
        std::env::set_var("WEYLO_TIMEOUT_SECS", "0");
        let cfg = ClientConfig::from_env();
        clear();
        assert_eq!(cfg.timeout, Duration::from_secs(1));
    }

    #[test]
    #[serial]
    fn blank_token_is_anonymous() {
        clear();
        std::env::set_var("WEYLO_API_TOKEN", "  ");
        let cfg = ClientConfig::from_env();
        clear();
        assert!(cfg.token.is_none());
    }
}
