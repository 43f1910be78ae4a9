use super::signals::wait_for_shutdown_signal;
use super::ShutdownReason;
use crate::camera::RateLimitedCameraSource;
use crate::client::PrinterClient;
use crate::commands::CommandDispatcher;
use crate::config::AthenaConfig;
use crate::coordinator::{PollingCoordinator, PollingCoordinatorBuilder};
use crate::error::Result;
use crate::events::EventBus;
use crate::registry::{DeviceRegistry, PrinterDevice};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Wires client, coordinator, camera, registry and dispatcher for one
/// printer and owns the background tasks.
pub struct MonitorRuntime {
    config: AthenaConfig,
    device_id: String,
    events: Arc<EventBus>,
    coordinator: Arc<PollingCoordinator>,
    camera: Arc<RateLimitedCameraSource>,
    dispatcher: Arc<CommandDispatcher>,
    cancellation_token: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl MonitorRuntime {
    pub fn new(config: AthenaConfig) -> Result<Self> {
        config.validate()?;

        let device_id = config.printer.host.clone();
        let client = PrinterClient::new(&config.printer)?;
        let events = Arc::new(EventBus::default());

        let coordinator = Arc::new(
            PollingCoordinatorBuilder::new()
                .client(client.clone())
                .polling(config.polling.clone())
                .event_bus(Arc::clone(&events))
                .build()?,
        );
        let camera = Arc::new(
            RateLimitedCameraSource::new(client, &config.camera).with_event_bus(Arc::clone(&events)),
        );

        let registry = Arc::new(DeviceRegistry::new());
        registry.register(PrinterDevice::new(
            device_id.clone(),
            Arc::clone(&coordinator),
            Arc::clone(&camera),
        ));
        let dispatcher = Arc::new(
            CommandDispatcher::new(registry, config.printer.command_timeout())
                .with_event_bus(Arc::clone(&events)),
        );

        info!(
            "Athena II monitor configured for {}",
            config.printer.base_url()
        );

        Ok(Self {
            config,
            device_id,
            events,
            coordinator,
            camera,
            dispatcher,
            cancellation_token: CancellationToken::new(),
            tasks: Vec::new(),
        })
    }

    pub fn config(&self) -> &AthenaConfig {
        &self.config
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn coordinator(&self) -> &Arc<PollingCoordinator> {
        &self.coordinator
    }

    pub fn camera(&self) -> &Arc<RateLimitedCameraSource> {
        &self.camera
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Run the first refresh and spawn the poll loop.
    ///
    /// A failed first refresh is not fatal; the loop keeps retrying.
    pub async fn start_polling(&mut self) {
        match self.coordinator.refresh().await {
            Ok(snapshot) => info!(
                "Initial refresh from {} returned {} fields",
                self.coordinator.host(),
                snapshot.len()
            ),
            Err(e) => warn!("Initial refresh failed, will retry: {}", e),
        }

        let coordinator = Arc::clone(&self.coordinator);
        let token = self.cancellation_token.child_token();
        let handle = tokio::spawn(async move { coordinator.run(token).await });
        self.tasks.push(("poller", handle));
    }

    /// Spawn the local HTTP API
    #[cfg(feature = "server")]
    pub fn start_server(&mut self) -> Result<()> {
        let server = crate::server::ApiServerBuilder::new()
            .config(self.config.server.clone())
            .dispatcher(Arc::clone(&self.dispatcher))
            .device_id(self.device_id.clone())
            .build()?;

        let token = self.cancellation_token.child_token();
        let handle = tokio::spawn(async move {
            if let Err(e) = server.run(token).await {
                error!("Local API server failed: {}", e);
            }
        });
        self.tasks.push(("server", handle));
        Ok(())
    }

    /// Block until a shutdown signal or cancellation, then stop every task
    pub async fn run_until_shutdown(&mut self) -> ShutdownReason {
        info!("Athena II monitor is running");

        let reason = tokio::select! {
            reason = wait_for_shutdown_signal() => reason,
            _ = self.cancellation_token.cancelled() => ShutdownReason::Cancelled,
        };

        info!("Shutdown initiated: {:?}", reason);
        reason
    }

    /// Cancel background tasks and wait for them; returns the exit code
    pub async fn shutdown(&mut self) -> i32 {
        info!("Beginning graceful shutdown");
        self.cancellation_token.cancel();

        let mut exit_code = 0;
        for (name, handle) in self.tasks.drain(..) {
            match tokio::time::timeout(TASK_STOP_TIMEOUT, handle).await {
                Ok(Ok(())) => info!("{} task stopped", name),
                Ok(Err(e)) => {
                    error!("{} task failed: {}", name, e);
                    exit_code = 1;
                }
                Err(_) => {
                    error!("Timeout stopping {} task", name);
                    exit_code = 1;
                }
            }
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        exit_code
    }
}
