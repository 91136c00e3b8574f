//! `ferrochat rag` — Toggle or inspect per-user RAG augmentation.

use ferrochat_core::message::UserId;

use crate::runtime::Runtime;

pub async fn run(action: String, user: String) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::bring_up().await?;
    let flags = runtime.rag_flags();
    let user = UserId::new(user);

    match action.as_str() {
        "on" => {
            flags.set_enabled(&user, true).await?;
            println!("  RAG enabled for {user}.");
        }
        "off" => {
            flags.set_enabled(&user, false).await?;
            println!("  RAG disabled for {user}.");
        }
        "status" => {
            let enabled = flags.is_enabled(&user).await;
            let index = runtime.index.snapshot().await;
            println!("  RAG for {user}: {}", if enabled { "on" } else { "off" });
            println!("  Indexed chunks: {}", index.len());
        }
        other => {
            return Err(format!("unknown action '{other}' (expected on, off, or status)").into());
        }
    }
    Ok(())
}
