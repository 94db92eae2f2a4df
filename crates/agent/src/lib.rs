//! The loopwright agent controller.
//!
//! [`AgentRunner`] drives the bounded recursive tool-calling loop: model
//! turn, tool dispatch, append results, repeat — until the model answers
//! in plain text or the iteration cap is hit.

pub mod runner;
pub mod test_helpers;

pub use runner::{
    AgentRunner, CancelHandle, DEFAULT_SYSTEM_PROMPT, FinalResult, Terminated,
};
