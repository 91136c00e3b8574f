//! Background polling of a state-bearing tool.
//!
//! An independent repeating task fetches keyed records through the tool
//! registry, diffs them against the last persisted snapshot, and publishes
//! a change event when anything moved. A failed poll is logged and skipped;
//! it never stops future iterations. The handle carries an explicit stop
//! signal for process shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ferrochat_core::error::Error;
use ferrochat_core::event::{DomainEvent, EventBus};
use ferrochat_core::tool::ToolCall;
use ferrochat_mcp::ToolRegistry;
use ferrochat_memory::SnapshotStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct TaskMonitor {
    registry: Arc<ToolRegistry>,
    snapshots: SnapshotStore,
    event_bus: Arc<EventBus>,
    /// Tool polled for the record list
    tool_name: String,
    interval: Duration,
}

/// Stop control for a spawned monitor.
pub struct MonitorHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal the loop to stop and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

impl TaskMonitor {
    pub fn new(
        registry: Arc<ToolRegistry>,
        snapshots: SnapshotStore,
        event_bus: Arc<EventBus>,
        tool_name: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            snapshots,
            event_bus,
            tool_name: tool_name.into(),
            interval,
        }
    }

    /// Start the repeating task. It polls until the handle is stopped.
    pub fn spawn(self) -> MonitorHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so a freshly
            // started monitor waits one full interval before polling.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.poll_once().await {
                            warn!(tool = %self.tool_name, error = %e, "Snapshot poll failed, will retry next interval");
                        }
                    }
                    _ = stop_rx.changed() => {
                        debug!(tool = %self.tool_name, "Monitor stopped");
                        return;
                    }
                }
            }
        });

        MonitorHandle {
            stop: stop_tx,
            task,
        }
    }

    /// One poll: fetch records, diff against the stored snapshot, persist
    /// the new one, publish a change event if anything moved.
    pub async fn poll_once(&self) -> Result<(), Error> {
        let call = ToolCall {
            id: format!("monitor_{}", self.tool_name),
            name: self.tool_name.clone(),
            arguments: serde_json::json!({}),
        };

        let result = self.registry.call_tool(&call).await;
        if result.is_error {
            return Err(Error::Internal(result.content));
        }

        let records = parse_records(&result.content)?;
        let previous = self.snapshots.load().await?;
        let changes = SnapshotStore::diff(&previous, &records);
        self.snapshots.save(&records).await?;

        if changes.is_empty() {
            debug!(tool = %self.tool_name, records = records.len(), "No snapshot changes");
            return Ok(());
        }

        debug!(
            tool = %self.tool_name,
            added = changes.added.len(),
            removed = changes.removed.len(),
            changed = changes.changed.len(),
            "Snapshot changed"
        );
        self.event_bus.publish(DomainEvent::SnapshotChanged {
            monitor: self.tool_name.clone(),
            added: changes.added.len(),
            removed: changes.removed.len(),
            changed: changes.changed.len(),
            timestamp: Utc::now(),
        });

        Ok(())
    }
}

/// Parse a tool reply into keyed records. Accepts either a JSON array of
/// objects with an `id` field, or an object with a `tasks` array in that
/// shape.
fn parse_records(content: &str) -> Result<HashMap<String, serde_json::Value>, Error> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| Error::Internal(format!("snapshot tool returned non-JSON: {e}")))?;

    let items = match &value {
        serde_json::Value::Array(items) => items.as_slice(),
        serde_json::Value::Object(map) => map
            .get("tasks")
            .and_then(|t| t.as_array())
            .map(|a| a.as_slice())
            .unwrap_or(&[]),
        _ => &[],
    };

    Ok(items
        .iter()
        .filter_map(|item| {
            let id = item.get("id")?;
            let key = match id {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key, item.clone()))
        })
        .collect())
}
