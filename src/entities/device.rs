use crate::snapshot::Snapshot;
use serde::Serialize;

pub const MANUFACTURER: &str = "Concepts3D";
pub const MODEL: &str = "Athena II";

/// Identity of one monitored printer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub sw_version: Option<String>,
}

impl DeviceInfo {
    pub fn new(device_id: &str, host: &str, snapshot: Option<&Snapshot>) -> Self {
        Self {
            identifier: device_id.to_string(),
            name: format!("{} ({})", MODEL, host),
            manufacturer: MANUFACTURER,
            model: MODEL,
            sw_version: snapshot.and_then(|s| s.str("Version")).map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_info() {
        let fields = json!({"Status": "Idle", "Version": "2.1.0"});
        let snapshot = Snapshot::from_fields(fields.as_object().cloned().unwrap()).unwrap();

        let info = DeviceInfo::new("athena-1", "192.168.1.50", Some(&snapshot));
        assert_eq!(info.name, "Athena II (192.168.1.50)");
        assert_eq!(info.manufacturer, "Concepts3D");
        assert_eq!(info.sw_version.as_deref(), Some("2.1.0"));

        assert_eq!(DeviceInfo::new("athena-1", "printer", None).sw_version, None);
    }
}
