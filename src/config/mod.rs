pub mod schema;

pub use schema::{
    AgentConfig, ArxivConfig, Config, EvaluationConfig, WebSearchConfig, WikipediaConfig,
};
