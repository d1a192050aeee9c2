//! `capstone tools`: List the tools the agent can call.

use capstone_gateway::AppState;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;
    // Listing never touches the index, so skip connecting to a remote one.
    config.index.backend = "memory".into();

    let state = AppState::from_config(&config).await?;
    let definitions = state.orchestrator.tools().definitions();

    println!("Available tools ({})", definitions.len());
    println!("====================");
    println!();
    for tool in definitions {
        println!("  {}", tool.name);
        println!("      {}", tool.description);
    }

    Ok(())
}
