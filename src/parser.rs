//! Classification and decoding of inbound frames.
//!
//! The hub sends two kinds of responses over the same delimited stream:
//!
//! - device status blocks, `?S...Device: <type>, Device Cde: <code>,
//!   Hardware Cde: <hw>, Firmware Ver: <version>`, with any subset of fields
//!   in any order
//! - zone property reports, `?<zone><OP><digits>`
//!
//! Anything else (echoes, partial frames, probe replies) is dropped.

use crate::codec::InboundFrame;
use crate::protocol::{Opcode, QUERY_PREFIX};
use crate::types::ZoneNumber;

const STATUS_PREFIX: &str = "?S";
const DEVICE_TYPE_KEY: &str = "Device: ";
const DEVICE_CODE_KEY: &str = "Device Cde: ";
const HARDWARE_CODE_KEY: &str = "Hardware Cde: ";
const FIRMWARE_KEY: &str = "Firmware Ver: ";

/// A decoded zone property report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneReport {
    pub zone: ZoneNumber,
    pub opcode: Opcode,
    /// Raw wire value, before any logical conversion
    pub value: i32,
}

/// Fields found in a device status block; absent keys stay `None`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceStatusReport {
    pub device_type: Option<String>,
    pub device_code: Option<String>,
    pub hardware_code: Option<String>,
    pub firmware_version: Option<String>,
}

/// A classified inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    DeviceStatus(DeviceStatusReport),
    Zone(ZoneReport),
}

/// Classify and decode one frame for a hub with `zone_count` zones
pub fn parse_frame(frame: &InboundFrame, zone_count: u8) -> Option<Response> {
    let body = frame.body();

    if body.starts_with(STATUS_PREFIX) && body.len() > STATUS_PREFIX.len() {
        return Some(Response::DeviceStatus(parse_device_status(body)));
    }

    match parse_zone_report(body, zone_count) {
        Some(report) => Some(Response::Zone(report)),
        None => {
            tracing::debug!("Ignoring unrecognized frame [{}]", frame.text);
            None
        }
    }
}

/// Decode `?<zone><OP><digits>` (delimiter already removed)
pub fn parse_zone_report(body: &str, zone_count: u8) -> Option<ZoneReport> {
    let rest = body.strip_prefix(QUERY_PREFIX)?;
    let zone = rest.chars().next()?.to_digit(10)? as ZoneNumber;
    if zone == 0 || zone > zone_count {
        return None;
    }

    let rest = rest.get(1..)?;
    let code = rest.get(..2)?;
    let digits = rest.get(2..)?;

    let Some(opcode) = Opcode::from_code(code) else {
        tracing::debug!("Zone [{}] ignoring unknown opcode [{}]", zone, code);
        return None;
    };

    match digits.trim().parse::<i32>() {
        Ok(value) => Some(ZoneReport { zone, opcode, value }),
        Err(_) => {
            tracing::debug!("Zone [{}] {} report has no numeric value [{}]", zone, opcode, digits);
            None
        }
    }
}

/// Scan a status block for the four known labels
pub fn parse_device_status(body: &str) -> DeviceStatusReport {
    let report = DeviceStatusReport {
        device_type: field_until_comma(body, DEVICE_TYPE_KEY),
        device_code: field_until_comma(body, DEVICE_CODE_KEY),
        hardware_code: field_until_comma(body, HARDWARE_CODE_KEY),
        // Always the last field
        firmware_version: field_to_end(body, FIRMWARE_KEY),
    };
    tracing::debug!("Parsed device status {:?}", report);
    report
}

fn field_until_comma(text: &str, key: &str) -> Option<String> {
    let start = text.find(key)? + key.len();
    let rest = &text[start..];
    let end = rest.find(',').unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}

fn field_to_end(text: &str, key: &str) -> Option<String> {
    let start = text.find(key)? + key.len();
    Some(text[start..].trim().to_string())
}
