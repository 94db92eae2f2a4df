//! ChatClient trait — the abstraction over the remote chat model.
//!
//! A ChatClient knows how to send a transcript plus advertised tool schemas
//! to a chat endpoint and parse the reply into exactly one assistant
//! message: either text, or a list of tool calls. It is the only place
//! aware of the wire shape; the rest of the core sees typed messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::message::Message;

/// A tool advertisement sent to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON-Schema-like object describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A single turn's request to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to address (e.g. "qwen3:8b")
    pub model: String,

    /// The full ordered transcript
    pub messages: Vec<Message>,

    /// Tools the model may call this turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Generation randomness
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling cutoff
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

pub fn default_temperature() -> f32 {
    0.1
}

pub fn default_top_p() -> f32 {
    0.9
}

/// The core ChatClient trait.
///
/// Implementations do not retry on their own beyond the configured
/// transport backoff; per-turn retries are the agent runner's decision.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// A human-readable name for this client (e.g. "ollama").
    fn name(&self) -> &str;

    /// Send one turn and parse the reply into an assistant message.
    ///
    /// The returned message carries either non-empty text or a non-empty
    /// tool-call list; a reply with neither is a [`ClientError::Protocol`].
    async fn send(&self, request: ChatRequest) -> std::result::Result<Message, ClientError>;

    /// Health check — can we reach the endpoint?
    async fn health_check(&self) -> std::result::Result<bool, ClientError> {
        Ok(true)
    }
}
