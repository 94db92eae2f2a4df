//! Test support: a scripted stand-in for the chat model.
//!
//! Returns a fixed sequence of replies, one per `send`, and records every
//! request it saw so tests can assert on what the runner sent.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use loopwright_core::{ChatClient, ChatRequest, ClientError, Message, ToolCall};

pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<Message, ClientError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Result<Message, ClientError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of model calls made.
    pub fn calls_made(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Shorthand for a tool-calling assistant reply.
pub fn tool_call_reply(calls: Vec<(&str, serde_json::Value)>) -> Message {
    let calls = calls
        .into_iter()
        .enumerate()
        .map(|(i, (name, args))| ToolCall {
            id: Some(format!("call_{i}")),
            name: name.to_string(),
            arguments: match args {
                serde_json::Value::Object(map) => map,
                _ => serde_json::Map::new(),
            },
        })
        .collect();
    Message::assistant_tool_calls("", calls)
}

#[async_trait]
impl ChatClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, request: ChatRequest) -> Result<Message, ClientError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Protocol("script exhausted".into())))
    }
}
