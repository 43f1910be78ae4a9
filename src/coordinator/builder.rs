use super::listener::SnapshotListener;
use super::poller::PollingCoordinator;
use crate::client::PrinterClient;
use crate::config::PollingConfig;
use crate::error::{AthenaError, Result};
use crate::events::EventBus;
use std::sync::Arc;

/// Builder for a polling coordinator
pub struct PollingCoordinatorBuilder {
    client: Option<PrinterClient>,
    polling: Option<PollingConfig>,
    events: Option<Arc<EventBus>>,
    listeners: Vec<Arc<dyn SnapshotListener>>,
}

impl PollingCoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            client: None,
            polling: None,
            events: None,
            listeners: Vec::new(),
        }
    }

    pub fn client(mut self, client: PrinterClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn polling(mut self, polling: PollingConfig) -> Self {
        self.polling = Some(polling);
        self
    }

    /// Share an existing event bus instead of creating a private one
    pub fn event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn SnapshotListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn build(self) -> Result<PollingCoordinator> {
        let client = self
            .client
            .ok_or_else(|| AthenaError::system("Printer client must be specified"))?;
        let polling = self
            .polling
            .ok_or_else(|| AthenaError::system("Polling configuration must be specified"))?;
        let events = self.events.unwrap_or_default();

        let coordinator = PollingCoordinator::new(client, &polling, events);
        for listener in self.listeners {
            coordinator.add_listener(listener);
        }

        Ok(coordinator)
    }
}

impl Default for PollingCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
