//! `ferrochat watch` — Poll a state-bearing tool and report changes.

use std::sync::Arc;
use std::time::Duration;

use ferrochat_agent::TaskMonitor;
use ferrochat_core::event::DomainEvent;
use ferrochat_memory::{JsonFileStore, SnapshotStore};

use crate::runtime::Runtime;

pub async fn run(tool: String, interval_secs: u64) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::bring_up().await?;

    let snapshots = SnapshotStore::new(
        Arc::new(JsonFileStore::new(
            runtime.config.data_dir.join("snapshots.json"),
        )),
        tool.clone(),
    );

    let monitor = TaskMonitor::new(
        Arc::clone(&runtime.registry),
        snapshots,
        Arc::clone(&runtime.event_bus),
        tool.clone(),
        Duration::from_secs(interval_secs),
    );

    let mut events = runtime.event_bus.subscribe();
    let handle = monitor.spawn();

    println!("  Watching '{tool}' every {interval_secs}s. Ctrl+C to stop.");

    loop {
        tokio::select! {
            event = events.recv() => {
                if let Ok(event) = event {
                    if let DomainEvent::SnapshotChanged { monitor, added, removed, changed, .. } = event.as_ref() {
                        println!(
                            "  [{monitor}] {added} added, {removed} removed, {changed} changed"
                        );
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    handle.stop().await;
    println!("  Stopped.");
    Ok(())
}
