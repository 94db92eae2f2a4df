//! Canned web search, matched by substring.

use async_trait::async_trait;

use loopwright_core::{ParamSpec, Tool, ToolError};

const RESULTS: &[(&str, &str)] = &[
    (
        "python programming",
        "Python is a high-level, interpreted programming language known for its simplicity and readability.",
    ),
    (
        "weather tokyo",
        "Tokyo weather: Currently 25°C, sunny skies expected throughout the week.",
    ),
    (
        "ai agents",
        "AI agents are autonomous systems that can perceive their environment and take actions to achieve goals.",
    ),
];

/// `search_web` — a fixed result table keyed by query substring.
pub struct WebSearchTool;

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web for information on a topic"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::string("query", "The search query").required()]
    }

    async fn call(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, ToolError> {
        let query = arguments
            .get("query")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let query_lower = query.to_lowercase();

        let result = RESULTS
            .iter()
            .find(|(key, _)| query_lower.contains(key))
            .map(|(_, text)| *text)
            .unwrap_or("No relevant results found");

        Ok(serde_json::json!({"query": query, "result": result}))
    }
}
