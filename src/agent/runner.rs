//! Bounded tool-call loop driving a research task to completion.
//!
//! Supports both:
//! - Native tool calling (Ollama function calling)
//! - Prompt-guided tool calling for providers without native support

use crate::providers::{ChatMessage, ChatRequest, ChatResponse, Provider, ToolCall};
use crate::tools::{Tool, ToolResult, ToolSpec};
use anyhow::Result;
use serde_json::json;
use std::fmt::Write;

/// Build the research system prompt enumerating the available tools.
fn system_prompt(tool_specs: &[ToolSpec]) -> String {
    let today = chrono::Local::now().format("%Y-%m-%d");
    let mut prompt = format!(
        "You are a research assistant. Today's date is {today}.\n\n\
         Answer the user's question by gathering information with the \
         available tools, then writing a concise, well-sourced answer. \
         Cite the URLs of the sources you used.\n\n\
         Available tools:\n"
    );
    for spec in tool_specs {
        prompt.push_str(&format!("- {}: {}\n", spec.name, spec.description));
    }
    prompt.push_str(
        "\nCall a tool when you need facts you do not already have. \
         When you have enough information, reply with the final answer as plain text.",
    );
    prompt
}

/// Run a single research task through the provider + tools loop.
///
/// The loop calls the provider with the tool specs and executes any tool
/// calls against the registry, either structured (native function calling)
/// or parsed from `<tool_call>` tags when the provider is prompt-guided.
/// Results feed back until the model replies with text only or the
/// iteration budget runs out.
pub async fn run_task(
    provider: &dyn Provider,
    tools: &[Box<dyn Tool>],
    task: &str,
    model: &str,
    temperature: f64,
    max_iterations: usize,
) -> Result<String> {
    let tool_specs: Vec<ToolSpec> = tools.iter().map(|t| t.spec()).collect();

    let mut messages = vec![
        ChatMessage::system(system_prompt(&tool_specs)),
        ChatMessage::user(task),
    ];

    let mut last_text = String::new();

    for iteration in 1..=max_iterations {
        tracing::debug!(iteration, "agent loop iteration");

        let request = ChatRequest {
            messages: &messages,
            tools: Some(&tool_specs),
        };
        let response: ChatResponse = provider.chat(request, model, temperature).await?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                input_tokens = ?usage.input_tokens,
                output_tokens = ?usage.output_tokens,
                "token usage"
            );
        }

        let raw_text = response.text_or_empty().to_string();
        let mut tool_calls = response.tool_calls.clone();
        let mut display_text = raw_text.clone();
        let mut tag_guided = false;

        // Prompt-guided providers return tool calls as tagged text rather
        // than structured fields.
        if tool_calls.is_empty() {
            let (plain, tagged) = parse_tagged_tool_calls(&raw_text);
            if !tagged.is_empty() {
                tag_guided = true;
                tool_calls = tagged;
                display_text = plain;
            }
        }

        if !display_text.trim().is_empty() {
            last_text = display_text;
        }

        if tool_calls.is_empty() {
            return Ok(last_text);
        }

        if tag_guided {
            // Keep the raw tagged text in history so the model sees its own
            // call format, and feed results back in <tool_result> tags.
            messages.push(ChatMessage::assistant(raw_text));
            let mut tool_results = String::new();
            for tool_call in &tool_calls {
                let result = execute_tool_call(tools, tool_call).await;
                tracing::info!(
                    tool = %tool_call.name,
                    success = result.success,
                    "executed tool call"
                );
                let body = if result.success {
                    result.output
                } else {
                    format!("Error: {}", result.output)
                };
                let _ = writeln!(
                    tool_results,
                    "<tool_result name=\"{}\">\n{}\n</tool_result>",
                    tool_call.name, body
                );
            }
            messages.push(ChatMessage::user(format!("[Tool results]\n{tool_results}")));
            continue;
        }

        // Record the assistant turn so the provider can replay structured
        // tool calls on the next request.
        messages.push(ChatMessage::assistant(
            json!({
                "content": response.text,
                "tool_calls": response.tool_calls,
            })
            .to_string(),
        ));

        for tool_call in &tool_calls {
            let result = execute_tool_call(tools, tool_call).await;
            tracing::info!(
                tool = %tool_call.name,
                success = result.success,
                "executed tool call"
            );
            messages.push(ChatMessage::tool(
                json!({
                    "tool_call_id": tool_call.id,
                    "tool_name": tool_call.name,
                    "content": result.output,
                })
                .to_string(),
            ));
        }
    }

    tracing::warn!(max_iterations, "iteration budget exhausted");
    if last_text.is_empty() {
        Ok(format!(
            "The research budget of {max_iterations} tool iterations was exhausted \
             before a final answer was produced."
        ))
    } else {
        Ok(last_text)
    }
}

/// Parse tool calls from a response that uses XML-style tag invocation:
///
/// ```text
/// <tool_call>
/// {"name": "arxiv_search_tool", "arguments": {"query": "black holes"}}
/// </tool_call>
/// ```
///
/// Returns the surrounding plain text and the parsed calls. A malformed tag
/// body is dropped with a warning rather than failing the turn. Only calls
/// explicitly wrapped in tags are extracted; bare JSON elsewhere in the
/// response is never treated as a call, so quoted tool output cannot trigger
/// execution.
fn parse_tagged_tool_calls(response: &str) -> (String, Vec<ToolCall>) {
    const OPEN: &str = "<tool_call>";
    const CLOSE: &str = "</tool_call>";

    let mut text_parts = Vec::new();
    let mut calls = Vec::new();
    let mut remaining = response;

    while let Some(start) = remaining.find(OPEN) {
        // An unclosed tag is plain text.
        let Some(end) = remaining[start..].find(CLOSE) else {
            break;
        };

        let before = &remaining[..start];
        if !before.trim().is_empty() {
            text_parts.push(before.trim().to_string());
        }

        let inner = remaining[start + OPEN.len()..start + end].trim();
        match serde_json::from_str::<serde_json::Value>(inner) {
            Ok(value) => {
                if let Some(name) = value.get("name").and_then(|n| n.as_str()) {
                    let arguments = value
                        .get("arguments")
                        .cloned()
                        .unwrap_or_else(|| json!({}));
                    calls.push(ToolCall {
                        id: uuid::Uuid::new_v4().to_string(),
                        name: name.to_string(),
                        arguments: arguments.to_string(),
                    });
                } else {
                    tracing::warn!("Malformed <tool_call> body: missing tool name");
                }
            }
            Err(e) => {
                tracing::warn!("Malformed <tool_call> JSON: {e}");
            }
        }

        remaining = &remaining[start + end + CLOSE.len()..];
    }

    if !remaining.trim().is_empty() {
        text_parts.push(remaining.trim().to_string());
    }

    (text_parts.join("\n"), calls)
}

/// Execute a single tool call. Unknown tools and execution failures are
/// reported back to the model as tool results rather than aborting the loop.
async fn execute_tool_call(tools: &[Box<dyn Tool>], tool_call: &ToolCall) -> ToolResult {
    let tool = tools.iter().find(|t| t.name() == tool_call.name);

    match tool {
        Some(t) => {
            let args: serde_json::Value = serde_json::from_str(&tool_call.arguments)
                .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

            match t.execute(args).await {
                Ok(result) => result,
                Err(e) => ToolResult::failure(format!("{e}")),
            }
        }
        None => ToolResult::failure(format!("Unknown tool: {}", tool_call.name)),
    }
}
