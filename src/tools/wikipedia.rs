use super::record::{render_encyclopedia, SearchRecord, SourceDetails};
use super::traits::{Tool, ToolResult};
use crate::config::WikipediaConfig;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Encyclopedic summary lookup via the MediaWiki action API.
///
/// Two requests: a title search for the best-matching page, then a bounded
/// plain-text extract of that page.
pub struct WikipediaSearchTool {
    language: String,
    sentences: usize,
    timeout_secs: u64,
}

impl WikipediaSearchTool {
    pub fn new(config: &WikipediaConfig) -> Self {
        Self {
            language: config.language.trim().to_lowercase(),
            sentences: config.sentences.clamp(1, 10),
            timeout_secs: config.timeout_secs.max(1),
        }
    }

    fn api_url(&self) -> String {
        format!("https://{}.wikipedia.org/w/api.php", self.language)
    }

    fn page_url(&self, title: &str) -> String {
        format!(
            "https://{}.wikipedia.org/wiki/{}",
            self.language,
            urlencoding::encode(&title.replace(' ', "_"))
        )
    }

    async fn lookup(&self, query: &str, sentences: usize) -> anyhow::Result<Option<SearchRecord>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let search_url = format!(
            "{}?action=query&list=search&srsearch={}&srlimit=1&format=json",
            self.api_url(),
            urlencoding::encode(query)
        );
        let response = client.get(&search_url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Wikipedia search failed with status: {}", response.status());
        }
        let body: serde_json::Value = response.json().await?;
        let Some(title) = parse_search_title(&body) else {
            return Ok(None);
        };

        let extract_url = format!(
            "{}?action=query&prop=extracts&exsentences={}&explaintext=1&redirects=1&titles={}&format=json",
            self.api_url(),
            sentences,
            urlencoding::encode(&title)
        );
        let response = client.get(&extract_url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!(
                "Wikipedia extract failed with status: {}",
                response.status()
            );
        }
        let body: serde_json::Value = response.json().await?;
        let summary = parse_extract(&body).unwrap_or_default();

        Ok(Some(SearchRecord {
            url: self.page_url(&title),
            title,
            details: SourceDetails::Encyclopedia { summary },
        }))
    }
}

fn parse_search_title(body: &serde_json::Value) -> Option<String> {
    body.get("query")?
        .get("search")?
        .as_array()?
        .first()?
        .get("title")?
        .as_str()
        .map(ToString::to_string)
}

fn parse_extract(body: &serde_json::Value) -> Option<String> {
    let pages = body.get("query")?.get("pages")?.as_object()?;
    let page = pages.values().next()?;
    page.get("extract")?
        .as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl Tool for WikipediaSearchTool {
    fn name(&self) -> &str {
        "wikipedia_search_tool"
    }

    fn description(&self) -> &str {
        "Searches Wikipedia for encyclopedic summaries and overviews. Use this for getting general knowledge, definitions, or background information on topics."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search keywords for the Wikipedia article."
                },
                "sentences": {
                    "type": "integer",
                    "description": "Number of sentences in the summary (default 5)."
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

        let sentences = args
            .get("sentences")
            .and_then(|s| s.as_u64())
            .map_or(self.sentences, |s| (s as usize).clamp(1, 10));

        tracing::info!(query, sentences, "Searching Wikipedia");

        match self.lookup(query, sentences).await? {
            Some(record) => Ok(ToolResult::ok(render_encyclopedia(&record))),
            None => Ok(ToolResult::ok(format!("No Wikipedia article found for: {query}"))),
        }
    }
}
