//! `loopwright ask` — one question, one answer.

use loopwright_agent::Terminated;
use loopwright_config::AppConfig;
use loopwright_core::Role;

pub async fn run(question: &str, show_transcript: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let runner = super::build_runner(&config)?;

    eprint!("  Thinking...");
    let result = runner.run(question).await?;
    eprint!("\r             \r");

    println!("{}", result.answer);

    if result.terminated_by == Terminated::Cap {
        eprintln!();
        eprintln!("  (stopped at the iteration cap after {} tool turns)", result.iterations_used);
    }

    if show_transcript {
        eprintln!();
        eprintln!("  --- transcript ({} messages) ---", result.transcript.len());
        for message in result.transcript.iter() {
            let tag = match message.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant if message.has_tool_calls() => "assistant(tool calls)",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            };
            let summary = if message.has_tool_calls() {
                message
                    .tool_calls
                    .iter()
                    .map(|c| {
                        format!(
                            "{}({})",
                            c.name,
                            serde_json::Value::Object(c.arguments.clone())
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            } else {
                message.content.clone()
            };
            eprintln!("  [{tag}] {summary}");
        }
    }

    Ok(())
}
