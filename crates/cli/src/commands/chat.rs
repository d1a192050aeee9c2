//! `capstone chat`: Interactive or single-message chat mode.

use capstone_config::AppConfig;
use capstone_core::message::ThreadId;
use capstone_gateway::AppState;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(message: Option<String>, thread: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    if config.api_key_for(&config.default_provider).is_none() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables (or put it in .env):");
        eprintln!("    GEMINI_API_KEY   = '...'   (default provider)");
        eprintln!("    OPENAI_API_KEY   = 'sk-...'");
        eprintln!("    CAPSTONE_API_KEY = '...'   (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let state = AppState::from_config(&config).await?;
    let _event_logger = capstone_gateway::spawn_event_logger(&state.event_bus);
    let orchestrator = state.orchestrator;
    let thread_id = ThreadId(thread);

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let outcome = orchestrator.run_turn(&thread_id, &msg).await;
        eprint!("\r              \r");
        println!("{}", outcome?.response);
        return Ok(());
    }

    println!();
    println!("  Capstone Agent - Interactive Mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Tools:     {}", orchestrator.tools().names().join(", "));
    println!("  Thread:    {thread_id}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input == "exit" || input == "quit" {
            break;
        }
        if input.is_empty() {
            print!("  You > ");
            std::io::stdout().flush()?;
            continue;
        }

        eprint!("  ...");
        match orchestrator.run_turn(&thread_id, input).await {
            Ok(outcome) => {
                eprint!("\r     \r");
                println!();
                for line in outcome.response.lines() {
                    println!("  Assistant > {line}");
                }
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}
