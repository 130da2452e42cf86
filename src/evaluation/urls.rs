//! Syntactic URL extraction and host classification.
//!
//! No network access happens here: extraction is a regex scan over free text
//! and classification only inspects the URL's authority component.

use regex::Regex;
use std::sync::OnceLock;

/// Characters commonly glued onto a URL by surrounding prose or markdown.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '\'', '"', '>'];

fn url_regex() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| {
        Regex::new(r#"https?://[^\s<>"'\)\]\}]+"#).expect("URL regex is valid")
    })
}

/// Extract every `http(s)://` token from a block of free text, in order of
/// appearance, duplicates preserved.
///
/// Trailing punctuation that is not part of the URL grammar is stripped, and
/// tokens with nothing after the scheme (a bare `http://`) are dropped.
pub fn extract_urls(text: &str) -> Vec<String> {
    url_regex()
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(TRAILING_PUNCTUATION))
        .filter(|candidate| {
            candidate
                .strip_prefix("http://")
                .or_else(|| candidate.strip_prefix("https://"))
                .is_some_and(|rest| !rest.is_empty())
        })
        .map(ToString::to_string)
        .collect()
}

/// Classify a URL into its registrable host: lowercase, `www.` prefix and
/// port stripped. Returns `None` when the authority component is missing or
/// unusable (empty host, userinfo, IPv6 literal).
pub fn classify_domain(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))?;

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();

    if authority.is_empty() || authority.contains('@') || authority.starts_with('[') {
        return None;
    }

    let host = authority
        .split(':')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_end_matches('.')
        .to_lowercase();

    if host.is_empty() {
        return None;
    }

    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Normalize a trusted-domain entry: lowercase, scheme/path/port stripped,
/// surrounding dots removed. Returns `None` for entries that cannot name a
/// domain (empty, embedded whitespace).
pub fn normalize_domain(raw: &str) -> Option<String> {
    let mut d = raw.trim().to_lowercase();
    if d.is_empty() {
        return None;
    }

    if let Some(stripped) = d.strip_prefix("https://") {
        d = stripped.to_string();
    } else if let Some(stripped) = d.strip_prefix("http://") {
        d = stripped.to_string();
    }

    if let Some((host, _)) = d.split_once('/') {
        d = host.to_string();
    }

    d = d.trim_start_matches('.').trim_end_matches('.').to_string();

    if let Some((host, _)) = d.split_once(':') {
        d = host.to_string();
    }

    if d.is_empty() || d.chars().any(char::is_whitespace) {
        return None;
    }

    Some(d)
}

/// Dot-delimited suffix match: a host is trusted when it equals the pattern
/// or is a sub-domain of it. `notarxiv.org` never matches `arxiv.org`.
pub fn domain_matches(host: &str, pattern: &str) -> bool {
    host == pattern || host.ends_with(&format!(".{pattern}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_urls_in_order_with_duplicates() {
        let text = "See https://a.org/x then https://b.org and https://a.org/x again";
        let urls = extract_urls(text);
        assert_eq!(urls, vec!["https://a.org/x", "https://b.org", "https://a.org/x"]);
    }

    #[test]
    fn extract_urls_strips_trailing_punctuation() {
        let urls = extract_urls("Read (https://arxiv.org/abs/1234). Also https://en.wikipedia.org/wiki/Cat, ok?");
        assert_eq!(urls, vec!["https://arxiv.org/abs/1234", "https://en.wikipedia.org/wiki/Cat"]);
    }

    #[test]
    fn extract_urls_handles_markdown_brackets() {
        let urls = extract_urls("[link](https://example.com/page) and <https://other.net>");
        assert_eq!(urls, vec!["https://example.com/page", "https://other.net"]);
    }

    #[test]
    fn extract_urls_drops_bare_scheme() {
        assert!(extract_urls("broken http:// token").is_empty());
        assert!(extract_urls("").is_empty());
    }

    #[test]
    fn classify_domain_lowercases_and_strips_www() {
        assert_eq!(
            classify_domain("https://WWW.ArXiv.org/abs/1234"),
            Some("arxiv.org".to_string())
        );
    }

    #[test]
    fn classify_domain_strips_port_and_trailing_dot() {
        assert_eq!(
            classify_domain("http://example.com.:8080/path"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn classify_domain_rejects_hostless_and_userinfo() {
        assert_eq!(classify_domain("http://"), None);
        assert_eq!(classify_domain("https://user@example.com"), None);
        assert_eq!(classify_domain("https://[::1]/x"), None);
        assert_eq!(classify_domain("ftp://example.com"), None);
    }

    #[test]
    fn normalize_domain_strips_scheme_and_path() {
        assert_eq!(
            normalize_domain("https://Docs.Example.com/path"),
            Some("docs.example.com".to_string())
        );
    }

    #[test]
    fn normalize_domain_rejects_whitespace() {
        assert!(normalize_domain("exa mple.com").is_none());
        assert!(normalize_domain("   ").is_none());
    }

    #[test]
    fn domain_matches_exact_and_subdomain() {
        assert!(domain_matches("arxiv.org", "arxiv.org"));
        assert!(domain_matches("export.arxiv.org", "arxiv.org"));
    }

    #[test]
    fn domain_matches_is_not_substring_match() {
        assert!(!domain_matches("myarxiv.org", "arxiv.org"));
        assert!(!domain_matches("notarxiv.org", "arxiv.org"));
    }
}
