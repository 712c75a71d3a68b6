//! Locating a device record under an account and the paths the publisher writes

use std::fmt;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{DeployError, DeployResult};

pub const OTA_COMMAND: &str = "ota";

/// Database location of one device: `/{uid}/{device_id}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePath {
    pub uid: String,
    pub device_id: String,
}

impl DevicePath {
    pub fn new(uid: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            device_id: device_id.into(),
        }
    }

    pub fn child(&self, relative: &str) -> String {
        format!("{}/{}", self, relative.trim_start_matches('/'))
    }

    pub fn firmware_version(&self) -> String {
        self.child("firmware/version")
    }

    pub fn firmware_bin(&self) -> String {
        self.child("firmware/bin")
    }

    pub fn restart(&self) -> String {
        self.child("data/restart")
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.uid, self.device_id)
    }
}

/// Name a device reports in its `info.device` field, if it has one
pub fn device_name(record: &Value) -> Option<&str> {
    record.get("info")?.get("device")?.as_str()
}

/// Returns the key of the first record whose `info.device` equals `name`.
///
/// Records are scanned in the order the database returned them; records
/// without an `info.device` string are skipped.
pub fn find_device_id<'a>(records: &'a Value, name: &str) -> Option<&'a str> {
    let records = records.as_object()?;
    for (device_id, record) in records {
        debug!("Device ID: {}", device_id);
        if device_name(record) == Some(name) {
            return Some(device_id.as_str());
        }
    }
    None
}

/// Resolves the database path of the device called `name` under account `uid`
pub fn resolve_device_path(uid: &str, records: &Value, name: &str) -> DeployResult<DevicePath> {
    let device_id =
        find_device_id(records, name).ok_or_else(|| DeployError::DeviceNotFound(name.to_string()))?;
    let path = DevicePath::new(uid, device_id);
    info!("Device path: {}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paths() {
        let path = DevicePath::new("uid-1", "dev-2");
        assert_eq!(path.to_string(), "/uid-1/dev-2");
        assert_eq!(path.firmware_version(), "/uid-1/dev-2/firmware/version");
        assert_eq!(path.firmware_bin(), "/uid-1/dev-2/firmware/bin");
        assert_eq!(path.restart(), "/uid-1/dev-2/data/restart");
    }

    #[test]
    fn test_first_match_wins() {
        let records: Value = serde_json::from_str(
            r#"{
                "dev-b": {"info": {"device": "garden"}},
                "dev-a": {"info": {"device": "garden"}}
            }"#,
        )
        .unwrap();
        assert_eq!(find_device_id(&records, "garden"), Some("dev-b"));
    }

    #[test]
    fn test_skips_records_without_info() {
        let records = json!({
            "dev-1": {"data": {"restart": ""}},
            "dev-2": {"info": {"ip": "10.0.0.2"}},
            "dev-3": {"info": "garden"},
            "dev-4": {"info": {"device": "garden"}}
        });
        assert_eq!(find_device_id(&records, "garden"), Some("dev-4"));
    }

    #[test]
    fn test_no_match() {
        let records = json!({
            "dev-1": {"info": {"device": "greenhouse"}}
        });
        assert_eq!(find_device_id(&records, "garden"), None);
        assert_eq!(find_device_id(&Value::Null, "garden"), None);
        assert!(matches!(
            resolve_device_path("uid-1", &records, "garden"),
            Err(DeployError::DeviceNotFound(name)) if name == "garden"
        ));
    }

    #[test]
    fn test_resolve_second_of_three() {
        let records = json!({
            "dev-1": {"info": {"device": "lawn"}},
            "dev-2": {"info": {"device": "garden"}},
            "dev-3": {"info": {"device": "orchard"}}
        });
        let path = resolve_device_path("uid-1", &records, "garden").unwrap();
        assert_eq!(path, DevicePath::new("uid-1", "dev-2"));
    }
}
