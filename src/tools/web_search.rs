use super::record::{render_web_results, SearchRecord, SourceDetails};
use super::traits::{Tool, ToolResult};
use crate::config::WebSearchConfig;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

const TAVILY_API_URL: &str = "https://api.tavily.com/search";

/// General-purpose web search via the Tavily API.
pub struct TavilySearchTool {
    api_key: Option<String>,
    max_results: usize,
    include_images: bool,
    timeout_secs: u64,
}

impl TavilySearchTool {
    pub fn new(config: &WebSearchConfig) -> Self {
        Self {
            api_key: config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToString::to_string),
            max_results: config.max_results.clamp(1, 10),
            include_images: config.include_images,
            timeout_secs: config.timeout_secs.max(1),
        }
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        include_images: bool,
    ) -> anyhow::Result<Vec<SearchRecord>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Tavily API key not configured. Set TAVILY_API_KEY or [web_search].api_key in config.toml"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let response = client
            .post(TAVILY_API_URL)
            .json(&json!({
                "api_key": api_key,
                "query": query,
                "max_results": max_results,
                "include_images": include_images,
                "search_depth": "basic",
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Tavily search failed with status: {status}");
        }

        let body: serde_json::Value = response.json().await?;
        Ok(parse_tavily_response(&body, max_results))
    }
}

fn parse_tavily_response(body: &serde_json::Value, max_results: usize) -> Vec<SearchRecord> {
    let mut records = Vec::new();

    if let Some(results) = body.get("results").and_then(|r| r.as_array()) {
        for result in results.iter().take(max_results) {
            let url = result.get("url").and_then(|u| u.as_str()).unwrap_or("");
            if url.is_empty() {
                continue;
            }
            records.push(SearchRecord {
                title: result
                    .get("title")
                    .and_then(|t| t.as_str())
                    .unwrap_or("No title")
                    .to_string(),
                url: url.to_string(),
                details: SourceDetails::Web {
                    snippet: result
                        .get("content")
                        .and_then(|c| c.as_str())
                        .unwrap_or("")
                        .to_string(),
                    image_url: None,
                },
            });
        }
    }

    if let Some(images) = body.get("images").and_then(|i| i.as_array()) {
        for image in images {
            let url = image
                .as_str()
                .or_else(|| image.get("url").and_then(|u| u.as_str()))
                .unwrap_or("");
            if url.is_empty() {
                continue;
            }
            records.push(SearchRecord {
                title: "Image".to_string(),
                url: url.to_string(),
                details: SourceDetails::Web {
                    snippet: String::new(),
                    image_url: Some(url.to_string()),
                },
            });
        }
    }

    records
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn name(&self) -> &str {
        "tavily_search_tool"
    }

    fn description(&self) -> &str {
        "Performs a general-purpose web search using Tavily. Use this for finding current news, recent developments, or general web information."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search keywords for retrieving information from the web."
                },
                "max_results": {
                    "type": "integer",
                    "description": "Number of results to return (default 5)."
                },
                "include_images": {
                    "type": "boolean",
                    "description": "Whether to include image results (default false)."
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

        let max_results = args
            .get("max_results")
            .and_then(|m| m.as_u64())
            .map_or(self.max_results, |m| (m as usize).clamp(1, 10));
        let include_images = args
            .get("include_images")
            .and_then(|i| i.as_bool())
            .unwrap_or(self.include_images);

        tracing::info!(query, max_results, include_images, "Searching web via Tavily");

        let records = self.search(query, max_results, include_images).await?;
        if records.is_empty() {
            return Ok(ToolResult::ok(format!("No results found for: {query}")));
        }

        Ok(ToolResult::ok(render_web_results(&records)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(api_key: Option<&str>) -> WebSearchConfig {
        WebSearchConfig {
            api_key: api_key.map(ToString::to_string),
            max_results: 5,
            include_images: false,
            timeout_secs: 15,
        }
    }

    #[test]
    fn parse_response_reads_results_and_images() {
        let body = json!({
            "results": [
                {"title": "Hit", "url": "https://example.com", "content": "snippet"},
                {"title": "No URL", "content": "dropped"}
            ],
            "images": ["https://example.com/i.png"]
        });
        let records = parse_tavily_response(&body, 5);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Hit");
        assert!(records[1].is_image());
    }

    #[test]
    fn parse_response_respects_max_results() {
        let body = json!({
            "results": [
                {"title": "A", "url": "https://a.org", "content": ""},
                {"title": "B", "url": "https://b.org", "content": ""}
            ]
        });
        let records = parse_tavily_response(&body, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "https://a.org");
    }

    #[test]
    fn parse_response_handles_empty_body() {
        assert!(parse_tavily_response(&json!({}), 5).is_empty());
    }

    #[test]
    fn blank_api_key_is_treated_as_missing() {
        let tool = TavilySearchTool::new(&test_config(Some("   ")));
        assert!(tool.api_key.is_none());
    }

    #[tokio::test]
    async fn execute_without_api_key_errors() {
        let tool = TavilySearchTool::new(&test_config(None));
        let err = tool
            .execute(json!({"query": "rust"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[tokio::test]
    async fn execute_missing_query_errors() {
        let tool = TavilySearchTool::new(&test_config(Some("key")));
        assert!(tool.execute(json!({})).await.is_err());
    }

    #[test]
    fn tool_metadata() {
        let tool = TavilySearchTool::new(&test_config(Some("key")));
        assert_eq!(tool.name(), "tavily_search_tool");
        assert!(tool.description().contains("Tavily"));
    }
}
