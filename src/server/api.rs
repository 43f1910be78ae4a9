use super::handlers::{
    camera_handler, command_handler, health_handler, sensors_handler, snapshot_handler,
};
use crate::commands::CommandDispatcher;
use crate::config::ServerConfig;
use crate::error::{AthenaError, Result};
use crate::registry::{DeviceRegistry, PrinterDevice};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared state for the Axum server
#[derive(Clone)]
pub struct ServerState {
    pub(crate) registry: Arc<DeviceRegistry>,
    pub(crate) dispatcher: Arc<CommandDispatcher>,
    pub(crate) device_id: Arc<str>,
}

impl ServerState {
    pub fn new(dispatcher: Arc<CommandDispatcher>, device_id: &str) -> Self {
        Self {
            registry: Arc::clone(dispatcher.registry()),
            dispatcher,
            device_id: Arc::from(device_id),
        }
    }

    pub(crate) fn device(&self) -> Option<Arc<PrinterDevice>> {
        self.registry.get(&self.device_id)
    }
}

/// Routes of the local API
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/snapshot", get(snapshot_handler))
        .route("/api/sensors", get(sensors_handler))
        .route("/api/camera.jpg", get(camera_handler))
        .route("/api/command/:name", post(command_handler))
        .with_state(state)
}

/// Local HTTP API over one monitored printer
pub struct ApiServer {
    config: ServerConfig,
    state: ServerState,
}

impl ApiServer {
    pub fn new(config: ServerConfig, state: ServerState) -> Self {
        Self { config, state }
    }

    /// Serve until `shutdown` fires
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let addr = format!("{}:{}", self.config.ip, self.config.port);
        info!("Starting local API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| AthenaError::system(format!("Failed to bind {}: {}", addr, e)))?;

        info!("Local API listening on {}", addr);

        axum::serve(listener, router(self.state.clone()))
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(|e| AthenaError::system(format!("Server error: {}", e)))?;

        info!("Local API server stopped");
        Ok(())
    }
}

/// Builder for the local API server
pub struct ApiServerBuilder {
    config: Option<ServerConfig>,
    dispatcher: Option<Arc<CommandDispatcher>>,
    device_id: Option<String>,
}

impl ApiServerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            dispatcher: None,
            device_id: None,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<CommandDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Device served by the camera, sensor and command routes
    pub fn device_id<S: Into<String>>(mut self, device_id: S) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn build(self) -> Result<ApiServer> {
        let config = self
            .config
            .ok_or_else(|| AthenaError::system("Server configuration is required"))?;
        let dispatcher = self
            .dispatcher
            .ok_or_else(|| AthenaError::system("Command dispatcher is required"))?;
        let device_id = self
            .device_id
            .ok_or_else(|| AthenaError::system("Device id is required"))?;

        Ok(ApiServer::new(config, ServerState::new(dispatcher, &device_id)))
    }
}

impl Default for ApiServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
