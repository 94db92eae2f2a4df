//! Built-in demo tools for the loopwright agent loop.
//!
//! These are canned-data fixtures, not real integrations. They exist so
//! every part of the loop — advertisement, validation, dispatch, chained
//! calls — can run against a local model with no external services.

pub mod org;
pub mod weather;
pub mod web_search;

pub use org::{ManagerTool, TeamMembersTool};
pub use weather::WeatherTool;
pub use web_search::WebSearchTool;

use loopwright_core::{ToolError, ToolRegistry};

/// A registry pre-loaded with every built-in tool.
pub fn default_registry() -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(WeatherTool))?;
    registry.register(Box::new(ManagerTool))?;
    registry.register(Box::new(TeamMembersTool))?;
    registry.register(Box::new(WebSearchTool))?;
    Ok(registry)
}
