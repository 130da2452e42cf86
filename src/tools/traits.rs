use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of a single tool execution, fed back to the model as text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            output: format!("Error: {message}"),
            error: Some(message),
        }
    }
}

/// Declarative description of a tool, handed to the provider so the model
/// can request invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// An agent-callable capability. Each research adapter implements this:
/// a name, a description the model sees, a JSON schema for its parameters,
/// and an async `execute`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }

        async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
            let text = args.get("text").and_then(|t| t.as_str()).unwrap_or_default();
            Ok(ToolResult::ok(text))
        }
    }

    #[test]
    fn spec_mirrors_tool_metadata() {
        let spec = EchoTool.spec();
        assert_eq!(spec.name, "echo");
        assert_eq!(spec.description, "Echoes its input");
        assert_eq!(spec.parameters["type"], "object");
    }

    #[test]
    fn failure_result_formats_output() {
        let result = ToolResult::failure("no results");
        assert!(!result.success);
        assert_eq!(result.output, "Error: no results");
        assert_eq!(result.error.as_deref(), Some("no results"));
    }

    #[tokio::test]
    async fn execute_roundtrip() {
        let result = EchoTool
            .execute(serde_json::json!({"text": "hi"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hi");
    }
}
