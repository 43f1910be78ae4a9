//! Read-only entity views over a [`Snapshot`].
//!
//! Each sensor is a static description with a plain value function; the
//! views never touch the network and never mutate the snapshot.

mod binary;
mod device;
mod sensors;

pub use binary::{BinarySensorDescription, BinarySensorDeviceClass, BinarySensorState, BINARY_SENSORS};
pub use device::{DeviceInfo, MANUFACTURER, MODEL};
pub use sensors::{SensorDescription, SensorDeviceClass, SensorState, StateClass, SENSORS};

use crate::snapshot::Snapshot;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Value reported by a sensor view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Unknown,
}

impl SensorValue {
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => SensorValue::Unknown,
            Some(Value::Bool(b)) => SensorValue::Bool(*b),
            Some(Value::Number(n)) => n.as_f64().map_or(SensorValue::Unknown, SensorValue::Number),
            Some(Value::String(s)) => SensorValue::Text(s.clone()),
            // Nested payloads are shown as their JSON text
            Some(other) => SensorValue::Text(other.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SensorValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, SensorValue::Unknown)
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Number(n) => write!(f, "{}", n),
            SensorValue::Text(s) => write!(f, "{}", s),
            SensorValue::Bool(b) => write!(f, "{}", if *b { "on" } else { "off" }),
            SensorValue::Unknown => write!(f, "unknown"),
        }
    }
}

/// Raw field lookup shared by most sensor descriptions
pub(crate) fn field(snapshot: &Snapshot, key: &str) -> SensorValue {
    SensorValue::from_json(snapshot.get(key))
}

/// Evaluate every sensor against the current snapshot.
///
/// Values come from the last published snapshot even when it is stale;
/// `available` tells consumers whether to trust them.
pub fn sensor_states(snapshot: Option<&Snapshot>, available: bool) -> Vec<SensorState> {
    SENSORS
        .iter()
        .map(|description| description.state(snapshot, available))
        .collect()
}

pub fn binary_sensor_states(snapshot: Option<&Snapshot>, available: bool) -> Vec<BinarySensorState> {
    BINARY_SENSORS
        .iter()
        .map(|description| description.state(snapshot, available))
        .collect()
}
