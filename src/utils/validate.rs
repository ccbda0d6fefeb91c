//! URL shape validation
//!
//! A submission is accepted only when it points at a single media resource on
//! the content platform: a post, reel or TV video. Profile pages and feed roots
//! are rejected. The same check runs again when an item is dispatched.

use url::Url;

/// Path prefixes that identify a single media resource
const MEDIA_PATH_KINDS: [&str; 4] = ["p", "reel", "reels", "tv"];

/// Host the validator accepts when no explicit list is configured
pub const DEFAULT_HOST: &str = "instagram.com";

#[derive(Debug, Clone)]
pub struct UrlValidator {
    allowed_hosts: Vec<String>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new(vec![DEFAULT_HOST.to_string()])
    }
}

impl UrlValidator {
    /// Hosts match exactly or as a parent domain (`instagram.com` accepts `www.instagram.com`).
    pub fn new(allowed_hosts: Vec<String>) -> Self {
        Self {
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| h.trim().trim_start_matches("www.").to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn allowed_hosts(&self) -> &[String] {
        &self.allowed_hosts
    }

    pub fn is_valid(&self, raw: &str) -> bool {
        let Ok(url) = Url::parse(raw) else {
            return false;
        };

        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        let Some(host) = url.host_str() else {
            return false;
        };
        if !self.host_allowed(host) {
            return false;
        }

        let mut segments = match url.path_segments() {
            Some(segments) => segments.filter(|s| !s.is_empty()),
            None => return false,
        };
        match (segments.next(), segments.next()) {
            (Some(kind), Some(_shortcode)) => MEDIA_PATH_KINDS.contains(&kind),
            _ => false,
        }
    }

    fn host_allowed(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.allowed_hosts.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Extract the media shortcode (`/reel/<code>/`) from an already validated URL.
pub fn shortcode(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let kind = segments.next()?;
    if !MEDIA_PATH_KINDS.contains(&kind) {
        return None;
    }
    segments.next().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_single_media_urls() {
        let v = UrlValidator::default();
        assert!(v.is_valid("https://www.instagram.com/p/C0abcDEF/"));
        assert!(v.is_valid("https://instagram.com/reel/C0abcDEF"));
        assert!(v.is_valid("https://m.instagram.com/tv/XYZ/?igsh=abc"));
        assert!(v.is_valid("http://www.instagram.com/reels/XYZ/"));
    }

    #[test]
    fn test_rejects_profiles_feeds_and_other_hosts() {
        let v = UrlValidator::default();
        assert!(!v.is_valid("https://www.instagram.com/"));
        assert!(!v.is_valid("https://www.instagram.com/someuser/"));
        assert!(!v.is_valid("https://www.instagram.com/p/"));
        assert!(!v.is_valid("https://evilinstagram.com/p/abc"));
        assert!(!v.is_valid("https://example.com/p/abc"));
        assert!(!v.is_valid("ftp://instagram.com/p/abc"));
        assert!(!v.is_valid("not-a-url"));
        assert!(!v.is_valid(""));
    }

    #[test]
    fn test_custom_hosts() {
        let v = UrlValidator::new(vec!["site".to_string()]);
        assert!(v.is_valid("https://site/p/1"));
        assert!(!v.is_valid("https://www.instagram.com/p/1"));
    }

    #[test]
    fn test_shortcode() {
        assert_eq!(
            shortcode("https://www.instagram.com/reel/C0abc/?utm_source=x"),
            Some("C0abc".to_string())
        );
        assert_eq!(shortcode("https://www.instagram.com/someuser/"), None);
    }
}
