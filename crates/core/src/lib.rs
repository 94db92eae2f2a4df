//! Core types and traits for the loopwright agent runtime.
//!
//! This crate defines the contracts every other crate builds on:
//!
//! - [`Message`] and [`Transcript`] — the append-only conversation record
//! - [`ChatClient`] — the provider abstraction the agent talks through
//! - [`Tool`] and [`ToolRegistry`] — callable capabilities with typed,
//!   validated parameters
//! - [`sanitize::clean`] — reasoning-span stripping for final output
//! - the error taxonomy ([`Error`], [`ClientError`], [`ToolError`],
//!   [`AgentError`])
//!
//! It stays dependency-light so downstream crates can depend on it without
//! pulling in transport or runtime machinery.

pub mod client;
pub mod error;
pub mod message;
pub mod sanitize;
pub mod tool;

pub use client::{ChatClient, ChatRequest, ToolDefinition};
pub use error::{AgentError, ClientError, Error, Result, ToolError};
pub use message::{Message, Role, ToolCall, Transcript};
pub use tool::{
    FINAL_ANSWER_TOOL, ParamKind, ParamSpec, Tool, ToolOutcome, ToolRegistry,
    final_answer_definition,
};
