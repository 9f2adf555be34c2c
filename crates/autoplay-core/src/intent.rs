//! Caller intent derived from page query parameters

use serde::{Deserialize, Serialize};
use url::Url;

/// Desired autoplay and mute state for one escalation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AutoplayIntent {
    /// Only `autoplay=true` requests an attempt
    pub autoplay: bool,
    /// `Some(true)` unmutes, `Some(false)` forces mute, `None` leaves it alone
    pub unmute: Option<bool>,
}

impl AutoplayIntent {
    pub fn new(autoplay: bool, unmute: Option<bool>) -> Self {
        Self { autoplay, unmute }
    }

    /// Parse from a raw query string, with or without the leading `?`
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut intent = Self::default();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "autoplay" => intent.autoplay = value == "true",
                "unmute" => {
                    intent.unmute = match value.as_ref() {
                        "true" => Some(true),
                        "false" => Some(false),
                        _ => None,
                    }
                }
                _ => {}
            }
        }

        intent
    }

    /// Parse from a full page URL
    pub fn from_url(url: &Url) -> Self {
        url.query().map(Self::from_query).unwrap_or_default()
    }

    /// Mute flag to apply before the first attempt, if any
    pub fn desired_muted(&self) -> Option<bool> {
        self.unmute.map(|unmute| !unmute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autoplay_requires_literal_true() {
        assert!(AutoplayIntent::from_query("?autoplay=true").autoplay);
        assert!(!AutoplayIntent::from_query("?autoplay=1").autoplay);
        assert!(!AutoplayIntent::from_query("?autoplay=TRUE").autoplay);
        assert!(!AutoplayIntent::from_query("").autoplay);
    }

    #[test]
    fn test_unmute_tristate() {
        assert_eq!(AutoplayIntent::from_query("unmute=true").unmute, Some(true));
        assert_eq!(AutoplayIntent::from_query("unmute=false").unmute, Some(false));
        assert_eq!(AutoplayIntent::from_query("unmute=yes").unmute, None);
        assert_eq!(AutoplayIntent::from_query("autoplay=true").unmute, None);
    }

    #[test]
    fn test_from_url() {
        let url = Url::parse("https://example.com/player?src=a.m3u8&autoplay=true&unmute=false").unwrap();
        let intent = AutoplayIntent::from_url(&url);
        assert_eq!(intent, AutoplayIntent::new(true, Some(false)));
        assert_eq!(intent.desired_muted(), Some(true));

        let bare = Url::parse("https://example.com/player").unwrap();
        assert_eq!(AutoplayIntent::from_url(&bare), AutoplayIntent::default());
    }
}
