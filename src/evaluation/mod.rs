//! Source-trust evaluation over the agent's free-text output.
//!
//! Given a set of trusted domain suffixes and a block of text (typically the
//! agent's final answer), [`evaluate`] extracts every URL, classifies its
//! host, and reports the fraction of classifiable URLs whose domain is
//! trusted. The whole module is pure and synchronous: same inputs, same
//! report, no I/O.
//!
//! Policy: URLs whose host cannot be parsed are excluded from the ratio
//! denominator and listed separately as unparseable, rather than silently
//! counted as unmatched.

pub mod urls;

pub use urls::{classify_domain, domain_matches, extract_urls, normalize_domain};

use std::fmt::Write;

/// Errors the evaluator can signal at its boundary.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// `min_ratio` must stay in `[0, 1]`; clamping would misrepresent the
    /// caller's threshold, so out-of-range values are refused outright.
    #[error("min_ratio must be between 0.0 and 1.0, got {0}")]
    InvalidMinRatio(f64),
}

/// Outcome of a single trust evaluation. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    /// Whether `matched_ratio >= min_ratio`.
    pub passed: bool,
    /// Fraction of classifiable URLs whose domain is trusted, in `[0, 1]`.
    /// Defined as 0 when no URL classifies.
    pub matched_ratio: f64,
    /// Distinct trusted domains, in order of first appearance in the text.
    pub matched_domains: Vec<String>,
    /// Distinct untrusted domains, in order of first appearance.
    pub unmatched_domains: Vec<String>,
    /// URL-like tokens whose host could not be parsed. Never counted in the
    /// ratio denominator.
    pub unparseable: Vec<String>,
    /// Stable markdown rendering of this report.
    pub rendered_text: String,
}

/// Evaluate the URLs cited in `text` against `trusted_domains`.
///
/// Trusted entries are normalized before matching (lowercased, scheme, path
/// and port stripped); a URL's domain matches when it equals an entry or is
/// one of its sub-domains. An empty trusted set is not an error; the ratio
/// is then 0 unless the text contains no URLs at all.
pub fn evaluate(
    trusted_domains: &[String],
    text: &str,
    min_ratio: f64,
) -> Result<EvaluationReport, EvaluationError> {
    if !(0.0..=1.0).contains(&min_ratio) {
        return Err(EvaluationError::InvalidMinRatio(min_ratio));
    }

    let trusted: Vec<String> = trusted_domains
        .iter()
        .filter_map(|entry| normalize_domain(entry))
        .collect();

    let mut matched_domains: Vec<String> = Vec::new();
    let mut unmatched_domains: Vec<String> = Vec::new();
    let mut unparseable: Vec<String> = Vec::new();
    let mut matched_urls = 0usize;
    let mut classifiable_urls = 0usize;

    for url in extract_urls(text) {
        let Some(domain) = classify_domain(&url) else {
            if !unparseable.contains(&url) {
                unparseable.push(url);
            }
            continue;
        };

        classifiable_urls += 1;
        let is_trusted = trusted.iter().any(|pattern| domain_matches(&domain, pattern));

        if is_trusted {
            matched_urls += 1;
            if !matched_domains.contains(&domain) {
                matched_domains.push(domain);
            }
        } else if !unmatched_domains.contains(&domain) {
            unmatched_domains.push(domain);
        }
    }

    let matched_ratio = if classifiable_urls == 0 {
        0.0
    } else {
        matched_urls as f64 / classifiable_urls as f64
    };

    let passed = matched_ratio >= min_ratio;

    let rendered_text = render_report(
        passed,
        matched_ratio,
        min_ratio,
        trusted.is_empty(),
        &matched_domains,
        &unmatched_domains,
        &unparseable,
    );

    Ok(EvaluationReport {
        passed,
        matched_ratio,
        matched_domains,
        unmatched_domains,
        unparseable,
        rendered_text,
    })
}

fn render_report(
    passed: bool,
    matched_ratio: f64,
    min_ratio: f64,
    trusted_is_empty: bool,
    matched: &[String],
    unmatched: &[String],
    unparseable: &[String],
) -> String {
    let mut out = String::new();

    out.push_str("## Source Trust Evaluation\n\n");
    let verdict = if passed { "PASS" } else { "FAIL" };
    let _ = writeln!(
        out,
        "Trusted sources: {:.1}% (threshold {:.1}%) — {verdict}",
        matched_ratio * 100.0,
        min_ratio * 100.0,
    );

    if trusted_is_empty {
        out.push_str("\nNo trusted domains were configured.\n");
    }

    out.push_str("\n### Matched\n");
    if matched.is_empty() {
        out.push_str("(none)\n");
    }
    for domain in matched {
        let _ = writeln!(out, "- ✅ {domain}");
    }

    out.push_str("\n### Unmatched\n");
    if unmatched.is_empty() {
        out.push_str("(none)\n");
    }
    for domain in unmatched {
        let _ = writeln!(out, "- ❌ {domain}");
    }

    if !unparseable.is_empty() {
        out.push_str("\n### Unparseable\n");
        for url in unparseable {
            let _ = writeln!(out, "- ⚠️ {url}");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trusted(entries: &[&str]) -> Vec<String> {
        entries.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn two_of_three_urls_match() {
        let report = evaluate(
            &trusted(&["wikipedia.org", "arxiv.org"]),
            "See https://en.wikipedia.org/wiki/Cat and https://example.com/page and https://arxiv.org/abs/1234",
            0.5,
        )
        .unwrap();

        assert!(report.passed);
        assert!((report.matched_ratio - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.matched_domains, vec!["en.wikipedia.org", "arxiv.org"]);
        assert_eq!(report.unmatched_domains, vec!["example.com"]);
        assert!(report.unparseable.is_empty());
    }

    #[test]
    fn no_urls_means_zero_ratio_and_fail() {
        let report = evaluate(&trusted(&["nature.com"]), "no links here", 0.4).unwrap();
        assert_eq!(report.matched_ratio, 0.0);
        assert!(!report.passed);
    }

    #[test]
    fn no_urls_passes_only_at_zero_threshold() {
        let report = evaluate(&trusted(&["nature.com"]), "still no links", 0.0).unwrap();
        assert_eq!(report.matched_ratio, 0.0);
        assert!(report.passed);
    }

    #[test]
    fn subdomains_match_but_lookalikes_do_not() {
        let report = evaluate(
            &trusted(&["arxiv.org"]),
            "https://export.arxiv.org/api and https://myarxiv.org/fake",
            0.0,
        )
        .unwrap();
        assert_eq!(report.matched_domains, vec!["export.arxiv.org"]);
        assert_eq!(report.unmatched_domains, vec!["myarxiv.org"]);
        assert!((report.matched_ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_min_ratio_is_refused() {
        let err = evaluate(&trusted(&["nature.com"]), "text", 1.5).unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidMinRatio(r) if r == 1.5));

        let err = evaluate(&trusted(&["nature.com"]), "text", -0.1).unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidMinRatio(_)));
    }

    #[test]
    fn empty_trusted_set_is_not_an_error() {
        let report = evaluate(&[], "https://example.com", 0.4).unwrap();
        assert!(!report.passed);
        assert_eq!(report.matched_ratio, 0.0);
        assert!(report.rendered_text.contains("No trusted domains were configured"));
    }

    #[test]
    fn trusted_entries_are_normalized_before_matching() {
        let report = evaluate(
            &trusted(&["https://Wikipedia.ORG/"]),
            "https://en.wikipedia.org/wiki/Cat",
            0.5,
        )
        .unwrap();
        assert!(report.passed);
        assert_eq!(report.matched_domains, vec!["en.wikipedia.org"]);
    }

    #[test]
    fn unparseable_urls_stay_out_of_the_ratio() {
        let report = evaluate(
            &trusted(&["nature.com"]),
            "See https://nature.com/articles/1 and https://user@example.com/paper.",
            1.0,
        )
        .unwrap();

        // One classifiable URL, trusted, so the ratio is 1.0 despite the
        // unparseable token.
        assert!(report.passed);
        assert!((report.matched_ratio - 1.0).abs() < f64::EPSILON);
        assert_eq!(report.matched_domains, vec!["nature.com"]);
        assert!(report.unmatched_domains.is_empty());
        assert_eq!(report.unparseable, vec!["https://user@example.com/paper"]);
        assert!(report.rendered_text.contains("user@example.com"));
    }

    #[test]
    fn evaluate_is_idempotent() {
        let text = "https://arxiv.org/abs/1 and https://example.com";
        let domains = trusted(&["arxiv.org"]);
        let first = evaluate(&domains, text, 0.5).unwrap();
        let second = evaluate(&domains, text, 0.5).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn domain_lists_preserve_first_appearance_order() {
        let report = evaluate(
            &trusted(&["a.org", "c.org"]),
            "https://c.org/1 https://b.net/1 https://a.org/1 https://b.net/2 https://c.org/2",
            0.0,
        )
        .unwrap();
        assert_eq!(report.matched_domains, vec!["c.org", "a.org"]);
        assert_eq!(report.unmatched_domains, vec!["b.net"]);
    }

    #[test]
    fn ratio_counts_urls_not_distinct_domains() {
        // Three URLs, two on the same trusted domain.
        let report = evaluate(
            &trusted(&["arxiv.org"]),
            "https://arxiv.org/abs/1 https://arxiv.org/abs/2 https://example.com",
            0.5,
        )
        .unwrap();
        assert!((report.matched_ratio - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.matched_domains, vec!["arxiv.org"]);
    }

    #[test]
    fn rendered_report_is_stable_markdown() {
        let report = evaluate(
            &trusted(&["arxiv.org"]),
            "https://arxiv.org/abs/1 and https://example.com",
            0.5,
        )
        .unwrap();
        assert!(report.rendered_text.starts_with("## Source Trust Evaluation"));
        assert!(report.rendered_text.contains("50.0%"));
        assert!(report.rendered_text.contains("- ✅ arxiv.org"));
        assert!(report.rendered_text.contains("- ❌ example.com"));
        assert!(!report.rendered_text.contains("Unparseable"));
    }
}
