//! Media reference extraction and normalization
//!
//! Finds the first whitelisted link in a chat message and reduces it to a
//! canonical form used for deduplication. Two spellings of the same video
//! (`https://www.youtube.com/watch?v=x&si=abc` and
//! `http://m.youtube.com/watch?v=x#t=3`) normalize to the same key.

use regex::Regex;
use url::Url;

use crate::utils::normalize_whitespace;

/// Query parameters that only carry tracking information
const TRACKING_PARAMS: &[&str] = &["si", "feature", "igshid", "igsh", "fbclid", "mibextid"];

/// A whitelisted reference found in a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedReference {
    /// Link as it appeared, trailing punctuation removed
    pub url: String,

    /// Canonical key used for deduplication
    pub normalized: String,

    /// Message text without the link, one entry per non-empty line
    pub caption: Vec<String>,
}

/// Extracts whitelisted links from free text
pub struct ReferenceExtractor {
    /// Pattern for http(s) links
    link_pattern: Regex,
    /// Accepted hosts, lowercase
    whitelist: Vec<String>,
}

impl ReferenceExtractor {
    /// Create an extractor accepting `whitelist` hosts and their subdomains
    pub fn new<S: AsRef<str>>(whitelist: &[S]) -> Self {
        Self {
            link_pattern: Regex::new(r#"(?i)https?://[^\s<>"']+"#)
                .expect("link pattern is valid"),
            whitelist: whitelist
                .iter()
                .map(|h| h.as_ref().trim().trim_start_matches("www.").to_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Extract the first whitelisted reference in `text`
    ///
    /// # Returns
    ///
    /// `None` for plain text and for links on other platforms
    pub fn extract(&self, text: &str) -> Option<ExtractedReference> {
        for found in self.link_pattern.find_iter(text) {
            let url = trim_trailing_punctuation(found.as_str());
            let Some(normalized) = self.normalize(url) else {
                continue;
            };

            let caption = text
                .replace(url, " ")
                .lines()
                .map(normalize_whitespace)
                .filter(|line| !line.is_empty())
                .collect();

            return Some(ExtractedReference {
                url: url.to_string(),
                normalized,
                caption,
            });
        }
        None
    }

    /// Canonical form of a whitelisted link
    ///
    /// Lowercases the host, strips `www.`/`m.` prefixes, the scheme, the
    /// fragment, tracking parameters and a trailing slash. Returns `None` when
    /// the link does not parse or its host is not whitelisted.
    pub fn normalize(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let host = canonical_host(parsed.host_str()?);

        if !self.is_whitelisted(&host) {
            return None;
        }

        let query: Vec<String> = parsed
            .query_pairs()
            .filter(|(key, _)| {
                let key = key.to_lowercase();
                !key.starts_with("utm_") && !TRACKING_PARAMS.contains(&key.as_str())
            })
            .map(|(key, value)| format!("{key}={value}"))
            .collect();

        let path = parsed.path().trim_end_matches('/');
        let mut normalized = format!("{host}{path}");
        if !query.is_empty() {
            normalized.push('?');
            normalized.push_str(&query.join("&"));
        }
        Some(normalized)
    }

    /// Whether `host` is a whitelisted host or a subdomain of one
    pub fn is_whitelisted(&self, host: &str) -> bool {
        let host = canonical_host(host);
        self.whitelist
            .iter()
            .any(|allowed| host == *allowed || host.ends_with(&format!(".{allowed}")))
    }
}

fn canonical_host(host: &str) -> String {
    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let host = host.strip_prefix("m.").unwrap_or(host);
    host.to_string()
}

fn trim_trailing_punctuation(url: &str) -> &str {
    url.trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']', '*'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_WHITELIST;

    fn extractor() -> ReferenceExtractor {
        ReferenceExtractor::new(DEFAULT_WHITELIST)
    }

    #[test]
    fn test_extract_with_caption() {
        let text = "Prédica del domingo\nhttps://youtu.be/abc123 \nBendiciones";
        let found = extractor().extract(text).unwrap();

        assert_eq!(found.url, "https://youtu.be/abc123");
        assert_eq!(found.normalized, "youtu.be/abc123");
        assert_eq!(found.caption, vec!["Prédica del domingo", "Bendiciones"]);
    }

    #[test]
    fn test_plain_text_is_ignored() {
        assert!(extractor().extract("Juan 3:16 Porque de tal manera...").is_none());
    }

    #[test]
    fn test_unsupported_domain_is_ignored() {
        assert!(extractor().extract("see https://example.com/video").is_none());
    }

    #[test]
    fn test_skips_to_first_whitelisted_link() {
        let text = "https://example.com/a then https://www.instagram.com/reel/XYZ/";
        let found = extractor().extract(text).unwrap();
        assert_eq!(found.normalized, "instagram.com/reel/XYZ");
    }

    #[test]
    fn test_normalization_collapses_variants() {
        let ex = extractor();
        let a = ex
            .normalize("https://www.youtube.com/watch?v=abc&si=track")
            .unwrap();
        let b = ex.normalize("http://m.youtube.com/watch?v=abc#t=30").unwrap();
        let c = ex
            .normalize("https://YouTube.com/watch?v=abc&utm_source=wa")
            .unwrap();

        assert_eq!(a, "youtube.com/watch?v=abc");
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_subdomains_are_whitelisted() {
        let ex = extractor();
        assert!(ex.is_whitelisted("web.facebook.com"));
        assert!(ex.is_whitelisted("vm.tiktok.com"));
        assert!(!ex.is_whitelisted("notyoutube.com"));
    }

    #[test]
    fn test_trailing_punctuation() {
        let found = extractor()
            .extract("Mira esto (https://fb.watch/xyz).")
            .unwrap();
        assert_eq!(found.url, "https://fb.watch/xyz");
    }
}
