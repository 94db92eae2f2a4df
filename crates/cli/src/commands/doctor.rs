//! `loopwright doctor` — diagnose endpoint and config health.

use std::time::Duration;

use loopwright_client::OpenAiCompatClient;
use loopwright_config::AppConfig;
use loopwright_core::ChatClient;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("loopwright doctor");
    println!("=================\n");

    let mut issues = 0;

    // Config
    let config_path = AppConfig::config_dir().join("config.toml");
    let config = match AppConfig::load() {
        Ok(config) => {
            if config_path.exists() {
                println!("  [ok]   Config file valid ({})", config_path.display());
            } else {
                println!("  [ok]   No config file, using defaults");
            }
            config
        }
        Err(e) => {
            println!("  [fail] Config invalid: {e}");
            issues += 1;
            AppConfig::default()
        }
    };

    // Endpoint
    let client = OpenAiCompatClient::new(
        "ollama",
        &config.base_url,
        config.api_key.clone(),
        Duration::from_secs(5),
    )?;
    match client.health_check().await {
        Ok(true) => println!("  [ok]   Endpoint reachable at {}", config.base_url),
        Ok(false) => {
            println!("  [warn] Endpoint answered with an error at {}", config.base_url);
            issues += 1;
        }
        Err(e) => {
            println!("  [fail] Endpoint unreachable: {e}");
            println!("         Is the model server running? Try: ollama serve");
            issues += 1;
        }
    }

    // Tools
    match loopwright_tools::default_registry() {
        Ok(registry) => println!("  [ok]   {} tools registered", registry.names().len()),
        Err(e) => {
            println!("  [fail] Tool registry: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed. Try: loopwright ask \"What's the weather in Tokyo?\"");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
