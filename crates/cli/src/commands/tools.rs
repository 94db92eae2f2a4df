//! `loopwright tools` — list the registered tools.

use loopwright_config::AppConfig;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let registry = super::build_registry(&config)?;

    println!();
    for definition in registry.definitions() {
        println!("  {}", definition.name);
        println!("      {}", definition.description);
        if let Some(properties) = definition.parameters["properties"].as_object() {
            for (name, prop) in properties {
                let kind = prop["type"].as_str().unwrap_or("?");
                let required = definition.parameters["required"]
                    .as_array()
                    .is_some_and(|r| r.iter().any(|v| v == name.as_str()));
                let marker = if required { " (required)" } else { "" };
                println!("      - {name}: {kind}{marker}");
            }
        }
        println!();
    }
    if config.offer_final_answer_tool {
        println!("  final_answer (reserved)");
        println!("      Lets the model terminate the run explicitly.");
        println!();
    }

    Ok(())
}
