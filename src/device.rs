use crate::parser::DeviceStatusReport;
use crate::types::PropertyValue;
use std::time::SystemTime;

/// A device identity field that changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceChange {
    DeviceType(String),
    DeviceCode(String),
    HardwareCode(String),
    /// Raw version string and the integer derived from it
    FirmwareVersion { raw: String, derived: u32 },
}

impl DeviceChange {
    /// Host-facing property name
    pub fn property_name(&self) -> &'static str {
        match self {
            DeviceChange::DeviceType(_) => "DeviceType",
            DeviceChange::DeviceCode(_) => "DeviceCode",
            DeviceChange::HardwareCode(_) => "HardwareCode",
            DeviceChange::FirmwareVersion { .. } => "FirmwareVersion",
        }
    }

    pub fn value(&self) -> PropertyValue {
        match self {
            DeviceChange::DeviceType(v)
            | DeviceChange::DeviceCode(v)
            | DeviceChange::HardwareCode(v)
            | DeviceChange::FirmwareVersion { raw: v, .. } => PropertyValue::from(v.clone()),
        }
    }
}

/// Fold a dotted version string into the integer used for firmware gating.
///
/// `"1.09"` folds to `1 * 10 + 9 = 19` and `"10.9"` to `109`. Strings without
/// a `.` and strings with a non-numeric part leave `prior` unchanged.
pub fn derive_firmware_version(raw: &str, prior: u32) -> u32 {
    let parts: Vec<&str> = raw.split('.').collect();
    if parts.len() < 2 {
        tracing::debug!("Firmware version [{}] has no separator, keeping {}", raw, prior);
        return prior;
    }

    let mut version: u32 = 0;
    for part in parts {
        match part.trim().parse::<u32>() {
            Ok(n) => version = version.saturating_mul(10).saturating_add(n),
            Err(_) => {
                tracing::warn!("Unparsable firmware version [{}], keeping {}", raw, prior);
                return prior;
            }
        }
    }
    tracing::debug!("Firmware version found [{}]", version);
    version
}

/// Identity of the connected hub
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceState {
    device_type: Option<String>,
    device_code: Option<String>,
    hardware_code: Option<String>,
    firmware_version: Option<String>,
    firmware_version_int: u32,
    last_updated: Option<SystemTime>,
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device_type(&self) -> Option<&str> {
        self.device_type.as_deref()
    }

    pub fn device_code(&self) -> Option<&str> {
        self.device_code.as_deref()
    }

    pub fn hardware_code(&self) -> Option<&str> {
        self.hardware_code.as_deref()
    }

    /// Firmware version exactly as reported
    pub fn firmware_version(&self) -> Option<&str> {
        self.firmware_version.as_deref()
    }

    /// Integer form of the firmware version, 0 until a dotted version is seen
    pub fn firmware_version_int(&self) -> u32 {
        self.firmware_version_int
    }

    /// Time the last status block was applied
    pub fn last_updated(&self) -> Option<SystemTime> {
        self.last_updated
    }

    /// Apply a status block, returning the fields that changed
    pub fn apply(&mut self, report: DeviceStatusReport) -> Vec<DeviceChange> {
        self.last_updated = Some(SystemTime::now());

        let mut changes = Vec::new();
        if let Some(v) = report.device_type {
            if replace(&mut self.device_type, &v) {
                changes.push(DeviceChange::DeviceType(v));
            }
        }
        if let Some(v) = report.device_code {
            if replace(&mut self.device_code, &v) {
                changes.push(DeviceChange::DeviceCode(v));
            }
        }
        if let Some(v) = report.hardware_code {
            if replace(&mut self.hardware_code, &v) {
                changes.push(DeviceChange::HardwareCode(v));
            }
        }
        if let Some(raw) = report.firmware_version {
            // Re-derived on every report
            self.firmware_version_int = derive_firmware_version(&raw, self.firmware_version_int);
            if replace(&mut self.firmware_version, &raw) {
                changes.push(DeviceChange::FirmwareVersion {
                    raw,
                    derived: self.firmware_version_int,
                });
            }
        }
        changes
    }
}

fn replace(slot: &mut Option<String>, value: &str) -> bool {
    if slot.as_deref() == Some(value) {
        false
    } else {
        *slot = Some(value.to_string());
        true
    }
}
