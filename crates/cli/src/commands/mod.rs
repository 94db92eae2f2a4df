pub mod ask;
pub mod chat;
pub mod doctor;
pub mod tools;

use std::sync::Arc;
use std::time::Duration;

use loopwright_agent::AgentRunner;
use loopwright_client::OpenAiCompatClient;
use loopwright_config::AppConfig;
use loopwright_core::ToolRegistry;

/// Build the runner from config: client, registry of built-in tools, and
/// the loop settings.
pub(crate) fn build_runner(config: &AppConfig) -> Result<AgentRunner, Box<dyn std::error::Error>> {
    let client = OpenAiCompatClient::new(
        "ollama",
        &config.base_url,
        config.api_key.clone(),
        Duration::from_secs(config.request_timeout_s),
    )?
    .with_max_retries(config.transport_retries);

    let registry = build_registry(config)?;

    let mut runner = AgentRunner::new(Arc::new(client), Arc::new(registry), &config.model_id)
        .with_temperature(config.temperature)
        .with_top_p(config.top_p)
        .with_max_iterations(config.max_iterations)
        .with_final_answer_tool(config.offer_final_answer_tool)
        .with_idempotent_short_circuit(config.allow_idempotent_short_circuit);
    if let Some(prompt) = &config.system_prompt {
        runner = runner.with_system_prompt(prompt.clone());
    }
    Ok(runner)
}

pub(crate) fn build_registry(config: &AppConfig) -> Result<ToolRegistry, Box<dyn std::error::Error>> {
    let mut registry = loopwright_tools::default_registry()?;
    registry = registry
        .with_result_max_bytes(config.result_max_bytes)
        .with_default_handler_timeout(Duration::from_secs(config.handler_timeout_s));
    Ok(registry)
}
