use crate::snapshot::Snapshot;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinarySensorDeviceClass {
    Running,
    Problem,
    Door,
    Connectivity,
}

pub struct BinarySensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub device_class: Option<BinarySensorDeviceClass>,
    pub value_fn: fn(&Snapshot) -> bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BinarySensorState {
    pub key: &'static str,
    pub name: &'static str,
    pub is_on: bool,
    pub available: bool,
    pub device_class: Option<BinarySensorDeviceClass>,
    pub icon: &'static str,
}

impl BinarySensorDescription {
    pub fn unique_id(&self, device_id: &str) -> String {
        format!("{}_{}", device_id, self.key)
    }

    /// Absent snapshots and absent fields both read as off
    pub fn state(&self, snapshot: Option<&Snapshot>, available: bool) -> BinarySensorState {
        BinarySensorState {
            key: self.key,
            name: self.name,
            is_on: snapshot.map(self.value_fn).unwrap_or(false),
            available,
            device_class: self.device_class,
            icon: self.icon,
        }
    }
}

pub static BINARY_SENSORS: [BinarySensorDescription; 8] = [
    BinarySensorDescription {
        key: "printing",
        name: "Printing",
        icon: "mdi:printer-3d-nozzle",
        device_class: Some(BinarySensorDeviceClass::Running),
        value_fn: |s| s.flag("Printing"),
    },
    BinarySensorDescription {
        key: "paused",
        name: "Paused",
        icon: "mdi:pause",
        device_class: None,
        value_fn: |s| s.flag("Paused"),
    },
    BinarySensorDescription {
        key: "halted",
        name: "Halted",
        icon: "mdi:stop-circle",
        device_class: Some(BinarySensorDeviceClass::Problem),
        value_fn: |s| s.flag("Halted"),
    },
    BinarySensorDescription {
        key: "panicked",
        name: "Panicked",
        icon: "mdi:alert-circle",
        device_class: Some(BinarySensorDeviceClass::Problem),
        value_fn: |s| s.flag("Panicked"),
    },
    BinarySensorDescription {
        key: "force_stop",
        name: "Force Stop",
        icon: "mdi:hand-back-right",
        device_class: None,
        value_fn: |s| s.flag("ForceStop"),
    },
    BinarySensorDescription {
        key: "auto_shutdown",
        name: "Auto Shutdown",
        icon: "mdi:power",
        device_class: None,
        value_fn: |s| s.flag("AutoShutdown"),
    },
    BinarySensorDescription {
        key: "covered",
        name: "Covered",
        icon: "mdi:inbox",
        device_class: Some(BinarySensorDeviceClass::Door),
        value_fn: |s| s.flag("Covered"),
    },
    BinarySensorDescription {
        key: "cast",
        name: "Cast",
        icon: "mdi:cast",
        device_class: Some(BinarySensorDeviceClass::Connectivity),
        value_fn: |s| s.flag("Cast"),
    },
];
