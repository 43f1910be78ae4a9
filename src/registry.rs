use crate::camera::RateLimitedCameraSource;
use crate::coordinator::PollingCoordinator;
use crate::entities::DeviceInfo;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// One monitored printer: its poll loop and its camera
pub struct PrinterDevice {
    id: String,
    coordinator: Arc<PollingCoordinator>,
    camera: Arc<RateLimitedCameraSource>,
}

impl PrinterDevice {
    pub fn new<S: Into<String>>(
        id: S,
        coordinator: Arc<PollingCoordinator>,
        camera: Arc<RateLimitedCameraSource>,
    ) -> Self {
        Self {
            id: id.into(),
            coordinator,
            camera,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn coordinator(&self) -> &Arc<PollingCoordinator> {
        &self.coordinator
    }

    pub fn camera(&self) -> &Arc<RateLimitedCameraSource> {
        &self.camera
    }

    pub fn device_info(&self) -> DeviceInfo {
        let snapshot = self.coordinator.snapshot();
        DeviceInfo::new(&self.id, self.coordinator.host(), snapshot.as_deref())
    }
}

/// Devices known to this process, keyed by device id
#[derive(Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, Arc<PrinterDevice>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device, returning the one it replaced
    pub fn register(&self, device: PrinterDevice) -> Option<Arc<PrinterDevice>> {
        info!("Registering Athena II device {} ({})", device.id, device.coordinator.host());
        self.devices
            .write()
            .insert(device.id.clone(), Arc::new(device))
    }

    pub fn remove(&self, device_id: &str) -> Option<Arc<PrinterDevice>> {
        debug!("Removing device {}", device_id);
        self.devices.write().remove(device_id)
    }

    pub fn get(&self, device_id: &str) -> Option<Arc<PrinterDevice>> {
        self.devices.read().get(device_id).cloned()
    }

    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.devices.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }
}
