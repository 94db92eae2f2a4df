//! `loopwright chat` — interactive session with conversation memory.
//!
//! The transcript is threaded across questions, so follow-ups can refer
//! to earlier answers and tool results.

use std::io::{BufRead, Write};

use loopwright_config::AppConfig;
use loopwright_core::Transcript;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let runner = super::build_runner(&config)?;

    println!();
    println!("  loopwright — interactive agent session");
    println!("  model: {}  endpoint: {}", config.model_id, config.base_url);
    println!("  Type a question and press Enter. 'help' for commands.");
    println!();

    let stdin = std::io::stdin();
    let mut transcript = Transcript::new();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();

        match input {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                println!("  Commands:");
                println!("    help        show this message");
                println!("    quit, exit  leave the session");
                println!("  Anything else is sent to the agent.");
                continue;
            }
            _ => {}
        }

        eprint!("  ...");
        match runner.resume(transcript, input).await {
            Ok(result) => {
                eprint!("\r     \r");
                println!();
                for line in result.answer.lines() {
                    println!("  Agent > {line}");
                }
                if result.iterations_used > 0 {
                    println!("  ({} tool turn(s))", result.iterations_used);
                }
                println!();
                transcript = result.transcript;
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  Error: {e}");
                // the failed run consumed the transcript; start fresh
                transcript = Transcript::new();
            }
        }
    }

    println!("  Bye.");
    Ok(())
}
