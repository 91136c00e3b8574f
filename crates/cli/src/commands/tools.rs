//! `ferrochat tools` — List the merged tool namespace.

use crate::runtime::Runtime;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::bring_up().await?;
    let tools = runtime.registry.tools();

    if tools.is_empty() {
        println!("  No tools available. Check mcp_servers in ferrochat.toml.");
        return Ok(());
    }

    println!(
        "  {} tool(s) from {} server(s):",
        tools.len(),
        runtime.registry.server_count()
    );
    println!();
    for tool in tools {
        let description: String = tool.description.chars().take(70).collect();
        println!("  {:<28} [{}] {}", tool.name, tool.server, description);
    }
    Ok(())
}
