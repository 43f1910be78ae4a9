use super::{field, SensorValue};
use crate::snapshot::Snapshot;
use serde::Serialize;
use serde_json::{Map, Value};

const PERCENTAGE: &str = "%";
const MILLIMETERS: &str = "mm";
const SECONDS: &str = "s";
const HOURS: &str = "h";
const CELSIUS: &str = "°C";
const RPM: &str = "RPM";
const PPM: &str = "PPM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorDeviceClass {
    Distance,
    Duration,
    Temperature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    Total,
    TotalIncreasing,
}

pub struct SensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: Option<&'static str>,
    pub unit: Option<&'static str>,
    pub device_class: Option<SensorDeviceClass>,
    pub state_class: Option<StateClass>,
    pub value_fn: fn(&Snapshot) -> SensorValue,
    pub attr_fn: Option<fn(&Snapshot) -> Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorState {
    pub key: &'static str,
    pub name: &'static str,
    pub value: SensorValue,
    pub unit: Option<&'static str>,
    pub available: bool,
    pub device_class: Option<SensorDeviceClass>,
    pub state_class: Option<StateClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
}

impl SensorDescription {
    const DEFAULT: SensorDescription = SensorDescription {
        key: "",
        name: "",
        icon: None,
        unit: None,
        device_class: None,
        state_class: Some(StateClass::Measurement),
        value_fn: |_| SensorValue::Unknown,
        attr_fn: None,
    };

    pub fn unique_id(&self, device_id: &str) -> String {
        format!("{}_{}", device_id, self.key)
    }

    pub fn value(&self, snapshot: &Snapshot) -> SensorValue {
        (self.value_fn)(snapshot)
    }

    pub fn state(&self, snapshot: Option<&Snapshot>, available: bool) -> SensorState {
        SensorState {
            key: self.key,
            name: self.name,
            value: snapshot.map_or(SensorValue::Unknown, |s| self.value(s)),
            unit: self.unit,
            available,
            device_class: self.device_class,
            state_class: self.state_class,
            attributes: self.attr_fn.zip(snapshot).map(|(attr_fn, s)| attr_fn(s)),
        }
    }
}

/// Percent of layers done, one decimal; 0 unless a print is running
fn print_progress(snapshot: &Snapshot) -> SensorValue {
    let total = snapshot.f64("LayersCount").unwrap_or(0.0);
    if total <= 0.0 || !snapshot.flag("Printing") {
        return SensorValue::Number(0.0);
    }
    let current = snapshot.f64("LayerID").unwrap_or(0.0);
    SensorValue::Number((current / total * 1000.0).round() / 10.0)
}

fn print_progress_attributes(snapshot: &Snapshot) -> Map<String, Value> {
    let mut attributes = Map::new();
    for (name, key) in [
        ("current_layer", "LayerID"),
        ("total_layers", "LayersCount"),
        ("print_file", "Path"),
    ] {
        attributes.insert(
            name.to_string(),
            snapshot.get(key).cloned().unwrap_or(Value::Null),
        );
    }
    attributes
}

/// Remaining layers times the current layer time, in seconds
fn estimated_time_remaining(snapshot: &Snapshot) -> SensorValue {
    let layer_time = snapshot.f64("LayerTime").unwrap_or(0.0);
    if !snapshot.flag("Printing") || layer_time <= 0.0 {
        return SensorValue::Unknown;
    }
    let total = snapshot.f64("LayersCount").unwrap_or(0.0);
    let current = snapshot.f64("LayerID").unwrap_or(0.0);
    SensorValue::Number((total - current) * layer_time)
}

pub static SENSORS: [SensorDescription; 47] = [
    // Print status
    SensorDescription {
        key: "status",
        name: "Status",
        icon: Some("mdi:printer-3d"),
        state_class: None,
        value_fn: |s| field(s, "Status"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "current_layer",
        name: "Current Layer",
        icon: Some("mdi:layers"),
        value_fn: |s| field(s, "LayerID"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "total_layers",
        name: "Total Layers",
        icon: Some("mdi:layers-triple"),
        state_class: Some(StateClass::Total),
        value_fn: |s| field(s, "LayersCount"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "print_progress",
        name: "Print Progress",
        icon: Some("mdi:progress-clock"),
        unit: Some(PERCENTAGE),
        value_fn: print_progress,
        attr_fn: Some(print_progress_attributes),
        ..SensorDescription::DEFAULT
    },
    // Heights and timing
    SensorDescription {
        key: "current_height",
        name: "Current Height",
        icon: Some("mdi:arrow-up-bold"),
        unit: Some(MILLIMETERS),
        device_class: Some(SensorDeviceClass::Distance),
        value_fn: |s| field(s, "CurrentHeight"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "plate_height",
        name: "Plate Height",
        icon: Some("mdi:arrow-collapse-down"),
        unit: Some(MILLIMETERS),
        device_class: Some(SensorDeviceClass::Distance),
        value_fn: |s| field(s, "PlateHeight"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "layer_time",
        name: "Layer Time",
        icon: Some("mdi:timer"),
        unit: Some(SECONDS),
        device_class: Some(SensorDeviceClass::Duration),
        value_fn: |s| field(s, "LayerTime"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "prev_layer_time",
        name: "Previous Layer Time",
        icon: Some("mdi:timer-outline"),
        unit: Some(SECONDS),
        device_class: Some(SensorDeviceClass::Duration),
        value_fn: |s| field(s, "PrevLayerTime"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "estimated_time_remaining",
        name: "Estimated Time Remaining",
        icon: Some("mdi:clock-end"),
        unit: Some(SECONDS),
        device_class: Some(SensorDeviceClass::Duration),
        value_fn: estimated_time_remaining,
        ..SensorDescription::DEFAULT
    },
    // Temperatures and fans
    SensorDescription {
        key: "system_temp",
        name: "System Temperature",
        unit: Some(CELSIUS),
        device_class: Some(SensorDeviceClass::Temperature),
        value_fn: |s| field(s, "temp"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "mcu_temp",
        name: "MCU Temperature",
        unit: Some(CELSIUS),
        device_class: Some(SensorDeviceClass::Temperature),
        value_fn: |s| field(s, "mcu"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "resin_temp",
        name: "Resin Temperature",
        unit: Some(CELSIUS),
        device_class: Some(SensorDeviceClass::Temperature),
        value_fn: |s| field(s, "resin"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "mcu_fan_rpm",
        name: "MCU Fan Speed",
        icon: Some("mdi:fan"),
        unit: Some(RPM),
        value_fn: |s| field(s, "mcu_fan_rpm"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "uv_fan_rpm",
        name: "UV Fan Speed",
        icon: Some("mdi:fan"),
        unit: Some(RPM),
        value_fn: |s| field(s, "uv_fan_rpm"),
        ..SensorDescription::DEFAULT
    },
    // Resin and lamp
    SensorDescription {
        key: "resin_level",
        name: "Resin Level",
        icon: Some("mdi:cup-water"),
        unit: Some(MILLIMETERS),
        device_class: Some(SensorDeviceClass::Distance),
        value_fn: |s| field(s, "ResinLevelMm"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "lamp_hours",
        name: "Lamp Hours",
        icon: Some("mdi:lightbulb-on"),
        unit: Some(HOURS),
        device_class: Some(SensorDeviceClass::Duration),
        state_class: Some(StateClass::TotalIncreasing),
        value_fn: |s| field(s, "LampHours"),
        ..SensorDescription::DEFAULT
    },
    // System resources
    SensorDescription {
        key: "disk_usage",
        name: "Disk Usage",
        icon: Some("mdi:harddisk"),
        unit: Some(PERCENTAGE),
        value_fn: |s| field(s, "disk"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "memory_usage",
        name: "Memory Usage",
        icon: Some("mdi:memory"),
        unit: Some(PERCENTAGE),
        value_fn: |s| field(s, "mem"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "cpu_usage",
        name: "CPU Usage",
        icon: Some("mdi:chip"),
        unit: Some(PERCENTAGE),
        value_fn: |s| field(s, "proc"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "process_count",
        name: "Process Count",
        icon: Some("mdi:application-cog"),
        value_fn: |s| field(s, "proc_numb"),
        ..SensorDescription::DEFAULT
    },
    // System info
    SensorDescription {
        key: "uptime",
        name: "Uptime",
        icon: Some("mdi:clock-outline"),
        state_class: None,
        value_fn: |s| field(s, "uptime"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "hostname",
        name: "Hostname",
        icon: Some("mdi:network"),
        state_class: None,
        value_fn: |s| field(s, "Hostname"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "ip_address",
        name: "IP Address",
        icon: Some("mdi:ip-network"),
        state_class: None,
        value_fn: |s| field(s, "IP"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "firmware_version",
        name: "Firmware Version",
        icon: Some("mdi:package-variant"),
        state_class: None,
        value_fn: |s| field(s, "Version"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "wifi",
        name: "WiFi",
        icon: Some("mdi:wifi"),
        state_class: None,
        value_fn: |s| field(s, "Wifi"),
        ..SensorDescription::DEFAULT
    },
    // Analytic metrics
    SensorDescription {
        key: "pressure",
        name: "Pressure",
        icon: Some("mdi:gauge"),
        value_fn: |s| field(s, "pressure"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "temperature_vat",
        name: "Vat Temperature",
        unit: Some(CELSIUS),
        device_class: Some(SensorDeviceClass::Temperature),
        value_fn: |s| field(s, "temperature_vat"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "temperature_vat_target",
        name: "Vat Temperature Target",
        unit: Some(CELSIUS),
        device_class: Some(SensorDeviceClass::Temperature),
        value_fn: |s| field(s, "temperature_vat_target"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "temperature_chamber",
        name: "Chamber Temperature",
        unit: Some(CELSIUS),
        device_class: Some(SensorDeviceClass::Temperature),
        value_fn: |s| field(s, "temperature_chamber"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "temperature_chamber_target",
        name: "Chamber Temperature Target",
        unit: Some(CELSIUS),
        device_class: Some(SensorDeviceClass::Temperature),
        value_fn: |s| field(s, "temperature_chamber_target"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "temperature_inside",
        name: "Inside Temperature",
        unit: Some(CELSIUS),
        device_class: Some(SensorDeviceClass::Temperature),
        value_fn: |s| field(s, "temperature_inside"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "temperature_inside_target",
        name: "Inside Temperature Target",
        unit: Some(CELSIUS),
        device_class: Some(SensorDeviceClass::Temperature),
        value_fn: |s| field(s, "temperature_inside_target"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "temperature_outside",
        name: "Outside Temperature",
        unit: Some(CELSIUS),
        device_class: Some(SensorDeviceClass::Temperature),
        value_fn: |s| field(s, "temperature_outside"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "temperature_outside_target",
        name: "Outside Temperature Target",
        unit: Some(CELSIUS),
        device_class: Some(SensorDeviceClass::Temperature),
        value_fn: |s| field(s, "temperature_outside_target"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "temperature_ptc",
        name: "PTC Temperature",
        unit: Some(CELSIUS),
        device_class: Some(SensorDeviceClass::Temperature),
        value_fn: |s| field(s, "temperature_ptc"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "temperature_ptc_target",
        name: "PTC Temperature Target",
        unit: Some(CELSIUS),
        device_class: Some(SensorDeviceClass::Temperature),
        value_fn: |s| field(s, "temperature_ptc_target"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "ptc_fan_rpm",
        name: "PTC Fan Speed",
        icon: Some("mdi:fan"),
        unit: Some(RPM),
        value_fn: |s| field(s, "ptc_fan_rpm"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "aegis_fan_rpm",
        name: "AEGIS Fan Speed",
        icon: Some("mdi:fan"),
        unit: Some(RPM),
        value_fn: |s| field(s, "aegis_fan_rpm"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "voc_inlet",
        name: "VOC Inlet",
        icon: Some("mdi:air-filter"),
        unit: Some(PPM),
        value_fn: |s| field(s, "voc_inlet"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "voc_outlet",
        name: "VOC Outlet",
        icon: Some("mdi:air-filter"),
        unit: Some(PPM),
        value_fn: |s| field(s, "voc_outlet"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "lift_height",
        name: "Lift Height",
        icon: Some("mdi:arrow-expand-vertical"),
        unit: Some(MILLIMETERS),
        device_class: Some(SensorDeviceClass::Distance),
        value_fn: |s| field(s, "lift_height"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "dynamic_wait",
        name: "Dynamic Wait",
        icon: Some("mdi:timer-sand"),
        unit: Some(SECONDS),
        device_class: Some(SensorDeviceClass::Duration),
        value_fn: |s| field(s, "dynamic_wait"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "cure",
        name: "Cure Time",
        icon: Some("mdi:timer"),
        unit: Some(SECONDS),
        device_class: Some(SensorDeviceClass::Duration),
        value_fn: |s| field(s, "cure"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "speed",
        name: "Speed",
        icon: Some("mdi:speedometer"),
        value_fn: |s| field(s, "speed"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "solid_area",
        name: "Solid Area",
        icon: Some("mdi:square"),
        value_fn: |s| field(s, "solid_area"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "area_count",
        name: "Area Count",
        icon: Some("mdi:counter"),
        value_fn: |s| field(s, "area_count"),
        ..SensorDescription::DEFAULT
    },
    SensorDescription {
        key: "largest_area",
        name: "Largest Area",
        icon: Some("mdi:resize"),
        value_fn: |s| field(s, "largest_area"),
        ..SensorDescription::DEFAULT
    },
];
