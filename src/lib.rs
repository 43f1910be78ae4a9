pub mod analytics;
pub mod app;
pub mod camera;
pub mod client;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod entities;
pub mod error;
pub mod events;
pub mod normalize;
pub mod registry;
pub mod snapshot;

#[cfg(feature = "server")]
pub mod server;

#[cfg(test)]
mod test_support;

pub use analytics::{AnalyticFetcher, ANALYTIC_METRICS};
pub use app::{MonitorRuntime, ShutdownReason};
pub use camera::{CachedFrame, FrameProcessor, MjpegFrameExtractor, RateLimitedCameraSource};
pub use client::{PrinterClient, PrinterInfo};
pub use commands::{CommandDispatcher, PrinterCommand};
pub use config::{AthenaConfig, Rotation};
pub use coordinator::{
    CoordinatorStats, FnListener, PollingCoordinator, PollingCoordinatorBuilder, SnapshotListener,
};
pub use entities::{DeviceInfo, SensorValue, BINARY_SENSORS, SENSORS};
pub use error::{ApiError, AthenaError, CameraError, CommandError, Result};
pub use events::{EventBus, MonitorEvent};
pub use normalize::normalize;
pub use registry::{DeviceRegistry, PrinterDevice};
pub use snapshot::Snapshot;

#[cfg(feature = "server")]
pub use server::{ApiServer, ApiServerBuilder};
