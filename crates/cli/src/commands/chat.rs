//! `ferrochat chat` — Interactive or single-message chat mode.

use ferrochat_core::message::UserId;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::runtime::Runtime;

pub async fn run(message: Option<String>, user: String) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::bring_up().await?;
    let service = runtime.chat_service()?;
    let user = UserId::new(user);

    if let Some(text) = message {
        // Single message mode
        let report = service.handle_message(&user, &text).await?;
        println!("{}", report.reply);
        print_citations(&report.citations);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  Ferrochat — Interactive Mode");
    println!();
    println!("  Model:   {}", runtime.config.provider.model);
    println!("  Servers: {}", runtime.registry.server_count());
    println!("  Tools:   {}", runtime.registry.tools().len());
    println!("  RAG:     {}", if service.rag_enabled(&user).await { "on" } else { "off" });
    println!();
    println!("  Type your message and press Enter. Type 'exit' to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_prompt();

    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            print_prompt();
            continue;
        }
        if text == "exit" {
            break;
        }
        if text == "/clear" {
            service.clear_history(&user).await;
            println!("  History cleared.");
            print_prompt();
            continue;
        }

        match service.handle_message(&user, text).await {
            Ok(report) => {
                println!();
                for reply_line in report.reply.lines() {
                    println!("  Assistant > {reply_line}");
                }
                if report.tool_was_used {
                    println!();
                    println!(
                        "  [{} tool call(s), {} tokens, ~${:.4}]",
                        report.tool_calls_executed,
                        report.usage.total_tokens,
                        report.estimated_cost_usd
                    );
                }
                print_citations(&report.citations);
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
        print_prompt();
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}

fn print_prompt() {
    use std::io::Write;
    print!("  You > ");
    let _ = std::io::stdout().flush();
}

fn print_citations(citations: &[String]) {
    if citations.is_empty() {
        return;
    }
    println!();
    println!("  Sources:");
    for citation in citations {
        println!("    {citation}");
    }
}
