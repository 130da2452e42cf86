//! Uniform result-record shape shared by the research adapters.
//!
//! Every record carries a required title + URL core; what else a source
//! knows about a result lives in a per-source payload variant rather than a
//! bag of optional fields.

use serde::Serialize;

/// A single search result from one of the research adapters.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRecord {
    pub title: String,
    pub url: String,
    pub details: SourceDetails,
}

/// Per-source payload of a [`SearchRecord`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourceDetails {
    /// Academic paper (arXiv).
    Paper {
        authors: Vec<String>,
        published: Option<String>,
        summary: String,
        pdf_url: Option<String>,
    },
    /// General web search hit (Tavily).
    Web {
        snippet: String,
        image_url: Option<String>,
    },
    /// Encyclopedic summary (Wikipedia).
    Encyclopedia { summary: String },
}

impl SearchRecord {
    /// True when this record is an image-only web hit.
    pub fn is_image(&self) -> bool {
        matches!(
            &self.details,
            SourceDetails::Web { image_url: Some(_), snippet } if snippet.is_empty()
        )
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

/// Render paper records into the numbered text block the agent loop feeds
/// back to the model.
pub fn render_papers(records: &[SearchRecord]) -> String {
    let mut lines = Vec::new();
    for (i, record) in records.iter().enumerate() {
        let SourceDetails::Paper {
            authors,
            published,
            summary,
            ..
        } = &record.details
        else {
            continue;
        };
        lines.push(format!("Paper {}: {}", i + 1, record.title));
        lines.push(format!("  Authors: {}", authors.join(", ")));
        lines.push(format!(
            "  Published: {}",
            published.as_deref().unwrap_or("N/A")
        ));
        lines.push(format!("  URL: {}", record.url));
        lines.push(format!("  Summary: {}", truncate(summary, 200)));
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Render web search records; image-only hits are summarized as a count.
pub fn render_web_results(records: &[SearchRecord]) -> String {
    let mut lines = Vec::new();
    let mut image_count = 0usize;
    let mut index = 0usize;

    for record in records {
        if record.is_image() {
            image_count += 1;
            continue;
        }
        let SourceDetails::Web { snippet, .. } = &record.details else {
            continue;
        };
        index += 1;
        lines.push(format!("Result {index}: {}", record.title));
        lines.push(format!("  URL: {}", record.url));
        lines.push(format!("  Content: {}", truncate(snippet, 300)));
        lines.push(String::new());
    }

    if image_count > 0 {
        lines.push(format!("Found {image_count} images."));
    }

    lines.join("\n")
}

/// Render a single encyclopedia record as a Title/URL/Summary block.
pub fn render_encyclopedia(record: &SearchRecord) -> String {
    let SourceDetails::Encyclopedia { summary } = &record.details else {
        return String::new();
    };
    format!(
        "Title: {}\nURL: {}\nSummary: {}",
        record.title, record.url, summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(title: &str, url: &str) -> SearchRecord {
        SearchRecord {
            title: title.into(),
            url: url.into(),
            details: SourceDetails::Paper {
                authors: vec!["A. Author".into(), "B. Author".into()],
                published: Some("2024-09-08".into()),
                summary: "s".repeat(250),
                pdf_url: None,
            },
        }
    }

    #[test]
    fn papers_render_numbered_with_truncated_summary() {
        let text = render_papers(&[paper("Black Holes", "https://arxiv.org/abs/1")]);
        assert!(text.contains("Paper 1: Black Holes"));
        assert!(text.contains("Authors: A. Author, B. Author"));
        assert!(text.contains("URL: https://arxiv.org/abs/1"));
        // 200 chars + ellipsis
        assert!(text.contains(&format!("Summary: {}...", "s".repeat(200))));
    }

    #[test]
    fn web_results_separate_images() {
        let records = vec![
            SearchRecord {
                title: "Hit".into(),
                url: "https://example.com".into(),
                details: SourceDetails::Web {
                    snippet: "content".into(),
                    image_url: None,
                },
            },
            SearchRecord {
                title: "Image".into(),
                url: "https://example.com/i.png".into(),
                details: SourceDetails::Web {
                    snippet: String::new(),
                    image_url: Some("https://example.com/i.png".into()),
                },
            },
        ];
        let text = render_web_results(&records);
        assert!(text.contains("Result 1: Hit"));
        assert!(!text.contains("Result 2"));
        assert!(text.contains("Found 1 images."));
    }

    #[test]
    fn encyclopedia_renders_title_url_summary() {
        let record = SearchRecord {
            title: "Cat".into(),
            url: "https://en.wikipedia.org/wiki/Cat".into(),
            details: SourceDetails::Encyclopedia {
                summary: "The cat is a small domesticated carnivore.".into(),
            },
        };
        let text = render_encyclopedia(&record);
        assert_eq!(
            text,
            "Title: Cat\nURL: https://en.wikipedia.org/wiki/Cat\nSummary: The cat is a small domesticated carnivore."
        );
    }

    #[test]
    fn record_serializes_with_source_tag() {
        let json = serde_json::to_value(&paper("T", "https://arxiv.org/abs/1")).unwrap();
        assert_eq!(json["details"]["source"], "paper");
        assert_eq!(json["title"], "T");
    }
}
