//! Chat client for OpenAI-compatible endpoints (Ollama, vLLM, OpenAI).
//!
//! Speaks `POST {base_url}/chat/completions` with non-streaming requests.
//! Reply parsing is tolerant of the quirks local runtimes exhibit: absent
//! `content`, tool-call arguments shipped as a JSON-encoded string, and
//! missing call ids.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use loopwright_core::{ChatClient, ChatRequest, ClientError, Message, Role, ToolCall};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// A [`ChatClient`] for any OpenAI-compatible chat-completions endpoint.
pub struct OpenAiCompatClient {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
    max_retries: u32,
}

impl OpenAiCompatClient {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
            max_retries: 0,
        })
    }

    /// A client for a local Ollama daemon. `base_url` defaults to
    /// `http://localhost:11434/v1` when not given.
    pub fn ollama(base_url: Option<&str>) -> Result<Self, ClientError> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            None,
            DEFAULT_REQUEST_TIMEOUT,
        )
    }

    /// Number of times a transport-level failure is retried with
    /// exponential backoff. Zero disables retries.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<Message, ClientError> {
        let body = ApiRequest::from_chat_request(request);
        debug!(model = %body.model, messages = body.messages.len(), "Sending chat request");

        let mut http = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout(e.to_string())
            } else {
                ClientError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status_code: status.as_u16(),
                message,
            });
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        parsed.into_message()
    }
}

#[async_trait]
impl ChatClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, request: ChatRequest) -> Result<Message, ClientError> {
        let mut attempt = 0;
        loop {
            match self.send_once(&request).await {
                Ok(message) => return Ok(message),
                // only transport-level failures are retryable here; malformed
                // or refused replies go straight back to the caller
                Err(e @ (ClientError::Transport(_) | ClientError::Timeout(_)))
                    if attempt < self.max_retries =>
                {
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                    warn!(attempt, ?delay, error = %e, "Chat request failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn health_check(&self) -> Result<bool, ClientError> {
        let mut http = self.client.get(format!("{}/models", self.base_url));
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }
        let response = http
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(response.status().is_success())
    }
}

// ---- wire format ----

#[derive(Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    top_p: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiToolDefinition>>,
}

#[derive(Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: ApiFunction,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Serialize, Deserialize)]
struct ApiFunction {
    #[serde(default)]
    name: Option<String>,
    /// Arguments arrive as a JSON-encoded string per the OpenAI wire format.
    #[serde(default)]
    arguments: String,
}

#[derive(Serialize)]
struct ApiToolDefinition {
    #[serde(rename = "type")]
    kind: &'static str,
    function: serde_json::Value,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

impl ApiRequest {
    fn from_chat_request(request: &ChatRequest) -> Self {
        Self {
            model: request.model.clone(),
            messages: request.messages.iter().map(to_api_message).collect(),
            temperature: request.temperature,
            top_p: request.top_p,
            stream: false,
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(
                    request
                        .tools
                        .iter()
                        .map(|t| ApiToolDefinition {
                            kind: "function",
                            function: serde_json::json!({
                                "name": t.name,
                                "description": t.description,
                                "parameters": t.parameters,
                            }),
                        })
                        .collect(),
                )
            },
        }
    }
}

fn to_api_message(message: &Message) -> ApiMessage {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .iter()
                .map(|call| ApiToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: ApiFunction {
                        name: Some(call.name.clone()),
                        arguments: serde_json::Value::Object(call.arguments.clone()).to_string(),
                    },
                })
                .collect(),
        )
    };
    ApiMessage {
        role: role.to_string(),
        content: Some(message.content.clone()),
        tool_calls,
        tool_call_id: message.tool_call_id.clone(),
        name: message.tool_name.clone(),
    }
}

impl ApiResponse {
    fn into_message(mut self) -> Result<Message, ClientError> {
        if self.choices.is_empty() {
            return Err(ClientError::Protocol("response contained no choices".into()));
        }
        let api = self.choices.remove(0).message;

        let mut tool_calls = Vec::new();
        for call in api.tool_calls.unwrap_or_default() {
            let name = call.function.name.filter(|n| !n.is_empty()).ok_or_else(|| {
                ClientError::Protocol("tool call is missing a function name".into())
            })?;
            tool_calls.push(ToolCall {
                id: call.id,
                name,
                arguments: parse_arguments(&call.function.arguments),
            });
        }

        let content = api.content.unwrap_or_default();
        if content.is_empty() && tool_calls.is_empty() {
            return Err(ClientError::Protocol(
                "assistant reply had neither content nor tool calls".into(),
            ));
        }

        Ok(if tool_calls.is_empty() {
            Message::assistant(content)
        } else {
            Message::assistant_tool_calls(content, tool_calls)
        })
    }
}

/// Tool-call arguments are a JSON-encoded string on the wire. Anything that
/// fails to parse as an object is treated as no arguments.
fn parse_arguments(raw: &str) -> serde_json::Map<String, serde_json::Value> {
    if raw.trim().is_empty() {
        return serde_json::Map::new();
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(other) => {
            warn!(value = %other, "Tool-call arguments were not a JSON object, ignoring");
            serde_json::Map::new()
        }
        Err(e) => {
            warn!(error = %e, "Tool-call arguments were not valid JSON, ignoring");
            serde_json::Map::new()
        }
    }
}
