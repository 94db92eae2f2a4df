//! HTTP chat clients for the loopwright agent loop.
//!
//! One transport is provided: [`OpenAiCompatClient`], which covers any
//! endpoint speaking the OpenAI chat-completions dialect, including a
//! local Ollama daemon.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatClient;
