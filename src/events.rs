use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

/// Events published by the coordinator, camera source and command dispatcher
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A poll cycle produced a new snapshot
    SnapshotUpdated { snapshot: Arc<Snapshot> },
    /// A poll cycle failed; the previous snapshot is still current
    UpdateFailed {
        host: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// A fresh camera frame was captured and cached
    FrameCaptured {
        bytes: usize,
        timestamp: DateTime<Utc>,
    },
    /// A print control command completed
    CommandExecuted {
        device_id: String,
        command: String,
        success: bool,
        timestamp: DateTime<Utc>,
    },
}

impl MonitorEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MonitorEvent::SnapshotUpdated { snapshot } => snapshot.fetched_at(),
            MonitorEvent::UpdateFailed { timestamp, .. } => *timestamp,
            MonitorEvent::FrameCaptured { timestamp, .. } => *timestamp,
            MonitorEvent::CommandExecuted { timestamp, .. } => *timestamp,
        }
    }

    pub fn description(&self) -> String {
        match self {
            MonitorEvent::SnapshotUpdated { snapshot } => {
                format!("Snapshot updated ({} fields)", snapshot.len())
            }
            MonitorEvent::UpdateFailed { host, error, .. } => {
                format!("Update failed for {}: {}", host, error)
            }
            MonitorEvent::FrameCaptured { bytes, .. } => {
                format!("Camera frame captured ({} bytes)", bytes)
            }
            MonitorEvent::CommandExecuted {
                device_id,
                command,
                success,
                ..
            } => format!(
                "Command {} on {} {}",
                command,
                device_id,
                if *success { "succeeded" } else { "failed" }
            ),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            MonitorEvent::SnapshotUpdated { .. } => "snapshot_updated",
            MonitorEvent::UpdateFailed { .. } => "update_failed",
            MonitorEvent::FrameCaptured { .. } => "frame_captured",
            MonitorEvent::CommandExecuted { .. } => "command_executed",
        }
    }
}

/// Broadcast bus for monitor events. Publishing never fails: events sent
/// while nobody listens are simply dropped.
pub struct EventBus {
    sender: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    /// Publish an event, returning how many subscribers received it
    pub fn publish(&self, event: MonitorEvent) -> usize {
        match &event {
            MonitorEvent::UpdateFailed { host, error, .. } => {
                warn!("Update failed for {}: {}", host, error);
            }
            MonitorEvent::CommandExecuted { .. } => {
                info!("{}", event.description());
            }
            _ => debug!("Publishing event: {}", event.description()),
        }

        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!("No subscribers for monitor event");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
