//! Research tool adapters exposed to the model during the agent loop.
//!
//! Each adapter implements the [`Tool`] trait defined in [`traits`]: a name,
//! a description the model sees, a JSON parameter schema, and an async
//! `execute` returning a structured [`ToolResult`]. Results are rendered to
//! plain text before going back to the model; the structured
//! [`record::SearchRecord`] shape exists so every adapter speaks the same
//! title + URL core regardless of source.

pub mod arxiv;
pub mod record;
pub mod traits;
pub mod web_search;
pub mod wikipedia;

pub use arxiv::ArxivSearchTool;
pub use record::{SearchRecord, SourceDetails};
pub use traits::{Tool, ToolResult, ToolSpec};
pub use web_search::TavilySearchTool;
pub use wikipedia::WikipediaSearchTool;

use crate::config::Config;

/// Assemble the research tool registry from config: arXiv, Tavily web
/// search, and Wikipedia.
pub fn research_tools(config: &Config) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(ArxivSearchTool::new(
            config.arxiv.max_results,
            config.arxiv.timeout_secs,
        )),
        Box::new(TavilySearchTool::new(&config.web_search)),
        Box::new(WikipediaSearchTool::new(&config.wikipedia)),
    ]
}
