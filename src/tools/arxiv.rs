use super::record::{render_papers, SearchRecord, SourceDetails};
use super::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Hard cap on arXiv results per query; the API is polite-use and the
/// original tool never requests more.
pub const ARXIV_MAX_RESULTS: usize = 5;

const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

/// Academic paper search against the arXiv Atom API.
pub struct ArxivSearchTool {
    max_results: usize,
    timeout_secs: u64,
}

impl ArxivSearchTool {
    pub fn new(max_results: usize, timeout_secs: u64) -> Self {
        Self {
            max_results: max_results.clamp(1, ARXIV_MAX_RESULTS),
            timeout_secs: timeout_secs.max(1),
        }
    }

    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<SearchRecord>> {
        let url = format!(
            "{ARXIV_API_URL}?search_query=all:{}&start=0&max_results={}",
            urlencoding::encode(query),
            max_results
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let response = client.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("arXiv query failed with status: {}", response.status());
        }

        let body = response.text().await?;
        Ok(parse_atom_feed(&body))
    }
}

/// Parse the arXiv Atom feed into paper records.
///
/// quick-xml rather than regex: Atom namespaces make regex parsing brittle.
/// Parsing is deliberately lenient: a malformed entry is skipped, not fatal.
fn parse_atom_feed(body: &str) -> Vec<SearchRecord> {
    use quick_xml::events::Event;

    #[derive(Default)]
    struct Entry {
        url: String,
        title: String,
        summary: String,
        published: Option<String>,
        authors: Vec<String>,
        pdf_url: Option<String>,
        in_entry: bool,
        in_author: bool,
        cur_tag: String,
    }

    let mut reader = quick_xml::Reader::from_str(body);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut papers = Vec::new();
    let mut cur = Entry::default();

    fn normalize_ws(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) | Err(_) => break,
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name.ends_with("entry") {
                    cur = Entry::default();
                    cur.in_entry = true;
                }
                if cur.in_entry && name.ends_with("author") {
                    cur.in_author = true;
                }
                cur.cur_tag = name;
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if cur.in_entry && name.ends_with("link") {
                    let mut href = None;
                    let mut is_pdf = false;
                    for attr in e.attributes().flatten() {
                        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                        let value = String::from_utf8_lossy(&attr.value).to_string();
                        match key.as_str() {
                            "href" => href = Some(value),
                            "title" if value == "pdf" => is_pdf = true,
                            _ => {}
                        }
                    }
                    if is_pdf {
                        cur.pdf_url = href;
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if !cur.in_entry {
                    continue;
                }
                let text = t.unescape().map(|t| t.to_string()).unwrap_or_default();
                let tag = cur.cur_tag.as_str();
                if tag.ends_with("id") {
                    cur.url = text.trim().to_string();
                } else if tag.ends_with("title") {
                    cur.title = normalize_ws(&text);
                } else if tag.ends_with("summary") {
                    cur.summary = normalize_ws(&text);
                } else if tag.ends_with("published") {
                    cur.published = Some(text.trim().to_string());
                } else if cur.in_author && tag.ends_with("name") {
                    cur.authors.push(normalize_ws(&text));
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name.ends_with("author") {
                    cur.in_author = false;
                }
                if name.ends_with("entry") && cur.in_entry {
                    if !cur.url.is_empty() && !cur.title.is_empty() {
                        papers.push(SearchRecord {
                            title: std::mem::take(&mut cur.title),
                            url: std::mem::take(&mut cur.url),
                            details: SourceDetails::Paper {
                                authors: std::mem::take(&mut cur.authors),
                                published: cur.published.take(),
                                summary: std::mem::take(&mut cur.summary),
                                pdf_url: cur.pdf_url.take(),
                            },
                        });
                    }
                    cur.in_entry = false;
                }
                cur.cur_tag.clear();
            }
            Ok(_) => {}
        }
        buf.clear();
    }

    papers
}

#[async_trait]
impl Tool for ArxivSearchTool {
    fn name(&self) -> &str {
        "arxiv_search_tool"
    }

    fn description(&self) -> &str {
        "Searches arXiv for academic research papers. Use this for finding scientific papers, academic articles, or research publications. Only pass the 'query' parameter; max_results is capped at 5."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search keywords for research papers."
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results (1-5, default 5)."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let query = args
            .get("query")
            .and_then(|q| q.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing required parameter: query"))?;

        if query.trim().is_empty() {
            anyhow::bail!("Search query cannot be empty");
        }

        let requested = args
            .get("max_results")
            .and_then(|m| m.as_u64())
            .map_or(self.max_results, |m| m as usize);
        let max_results = requested.clamp(1, self.max_results);
        if requested > max_results {
            tracing::debug!(requested, max_results, "arXiv max_results clamped");
        }

        tracing::info!(query, max_results, "Searching arXiv");

        let records = self.search(query, max_results).await?;
        if records.is_empty() {
            return Ok(ToolResult::ok(format!("No papers found for: {query}")));
        }

        Ok(ToolResult::ok(render_papers(&records)))
    }
}
