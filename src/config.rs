use crate::error::{Digi5Error, Result};
use crate::protocol::GlobalCommand;
use crate::types::ZoneNumber;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Number of zones the hub model exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ZoneCount {
    Four,
    Six,
}

impl ZoneCount {
    pub fn get(self) -> u8 {
        match self {
            ZoneCount::Four => 4,
            ZoneCount::Six => 6,
        }
    }
}

impl TryFrom<u8> for ZoneCount {
    type Error = Digi5Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            4 => Ok(ZoneCount::Four),
            6 => Ok(ZoneCount::Six),
            n => Err(Digi5Error::InvalidConfig(format!(
                "zone count must be 4 or 6, got {}",
                n
            ))),
        }
    }
}

impl From<ZoneCount> for u8 {
    fn from(value: ZoneCount) -> Self {
        value.get()
    }
}

/// Driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Serial port the hub is attached to (`COM1`, `/dev/ttyUSB0`)
    pub serial_port: String,
    pub baud_rate: u32,
    pub zone_count: ZoneCount,
    /// Seconds between full status refresh passes
    pub refresh_interval_secs: u64,
    /// Friendly names of sources 1..=5
    pub source_names: Vec<String>,
    /// Friendly names of zones 1..=zone_count
    pub zone_names: Vec<String>,
    /// Frame sent to check the line is alive
    pub probe_request: String,
    pub probe_interval_ms: u64,
    /// How long to wait for any inbound frame after a probe
    pub probe_timeout_ms: u64,
    /// Whether inbound frames keep their trailing delimiter
    pub include_delimiter: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            serial_port: "COM1".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            zone_count: ZoneCount::Four,
            refresh_interval_secs: 1,
            source_names: Vec::new(),
            zone_names: Vec::new(),
            probe_request: GlobalCommand::Ping.frame().to_string(),
            probe_interval_ms: 5000,
            probe_timeout_ms: 1000,
            include_delimiter: true,
        }
    }
}

impl HubConfig {
    /// Create a builder for the config
    pub fn builder() -> HubConfigBuilder {
        HubConfigBuilder::default()
    }

    /// Parse settings from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: HubConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject settings the driver cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            return Err(Digi5Error::InvalidConfig(
                "refresh interval must be at least 1 second".to_string(),
            ));
        }
        if self.serial_port.trim().is_empty() {
            return Err(Digi5Error::InvalidConfig("serial port is empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(Digi5Error::InvalidConfig("baud rate is zero".to_string()));
        }
        Ok(())
    }

    pub fn zone_count(&self) -> u8 {
        self.zone_count.get()
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Friendly name of a zone, if configured and non-empty
    pub fn zone_name(&self, zone: ZoneNumber) -> Option<&str> {
        name_at(&self.zone_names, i32::from(zone))
    }

    /// Friendly name of a source, if configured and non-empty
    pub fn source_name(&self, source: i32) -> Option<&str> {
        name_at(&self.source_names, source)
    }

    /// 1-based source number with the given friendly name
    pub fn source_number(&self, name: &str) -> Option<i32> {
        self.source_names
            .iter()
            .position(|n| n == name)
            .map(|index| index as i32 + 1)
    }
}

fn name_at(names: &[String], number: i32) -> Option<&str> {
    let index = usize::try_from(number.checked_sub(1)?).ok()?;
    names
        .get(index)
        .map(String::as_str)
        .filter(|name| !name.is_empty())
}

/// Builder for HubConfig.
#[derive(Debug, Clone, Default)]
pub struct HubConfigBuilder {
    config: HubConfig,
}

impl HubConfigBuilder {
    pub fn serial_port(mut self, port: impl Into<String>) -> Self {
        self.config.serial_port = port.into();
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.config.baud_rate = baud_rate;
        self
    }

    pub fn zone_count(mut self, zone_count: ZoneCount) -> Self {
        self.config.zone_count = zone_count;
        self
    }

    pub fn refresh_interval_secs(mut self, secs: u64) -> Self {
        self.config.refresh_interval_secs = secs;
        self
    }

    pub fn source_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.source_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn zone_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.zone_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn probe_request(mut self, request: impl Into<String>) -> Self {
        self.config.probe_request = request.into();
        self
    }

    pub fn probe_interval_ms(mut self, ms: u64) -> Self {
        self.config.probe_interval_ms = ms;
        self
    }

    pub fn probe_timeout_ms(mut self, ms: u64) -> Self {
        self.config.probe_timeout_ms = ms;
        self
    }

    pub fn include_delimiter(mut self, include: bool) -> Self {
        self.config.include_delimiter = include;
        self
    }

    pub fn build(self) -> HubConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.zone_count(), 4);
        assert_eq!(config.refresh_interval(), Duration::from_secs(1));
        assert_eq!(config.probe_request, "?DI+");
        assert_eq!(config.probe_timeout(), Duration::from_millis(1000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let config = HubConfig::from_json_str(
            r#"{
                "serial_port": "/dev/ttyUSB0",
                "zone_count": 6,
                "refresh_interval_secs": 5,
                "source_names": ["Tuner", "CD", "Streamer", "TV", "Local"]
            }"#,
        )
        .unwrap();
        assert_eq!(config.serial_port, "/dev/ttyUSB0");
        assert_eq!(config.zone_count, ZoneCount::Six);
        assert_eq!(config.refresh_interval_secs, 5);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.source_number("TV"), Some(4));
        assert_eq!(config.source_name(5), Some("Local"));
        assert_eq!(config.source_name(6), None);
        assert_eq!(config.source_name(0), None);
    }

    #[test]
    fn test_rejects_bad_zone_count() {
        let err = HubConfig::from_json_str(r#"{ "zone_count": 5 }"#).unwrap_err();
        assert!(matches!(err, Digi5Error::Config(_)));
        assert!(ZoneCount::try_from(8).is_err());
    }

    #[test]
    fn test_rejects_zero_interval() {
        let config = HubConfig::builder().refresh_interval_secs(0).build();
        assert!(matches!(config.validate(), Err(Digi5Error::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_names() {
        let config = HubConfig::builder()
            .serial_port("COM3")
            .zone_count(ZoneCount::Six)
            .zone_names(["Kitchen", "", "Patio"])
            .build();
        assert_eq!(config.zone_name(1), Some("Kitchen"));
        assert_eq!(config.zone_name(2), None);
        assert_eq!(config.zone_name(3), Some("Patio"));
        assert_eq!(config.zone_name(7), None);
    }
}
