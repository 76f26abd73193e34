use crate::codec::InboundFrame;
use crate::device::DeviceState;
use crate::parser::{parse_frame, Response};
use crate::protocol::GlobalCommand;
use crate::subscription::StateUpdate;
use crate::types::ZoneNumber;
use crate::zone::{ZoneCommand, ZoneState, ZoneValue};

/// Device identity plus every zone, mutated only through `handle_frame`
#[derive(Debug, Clone)]
pub struct HubState {
    device: DeviceState,
    zones: Vec<ZoneState>,
}

impl HubState {
    pub fn new(zone_count: u8) -> Self {
        tracing::debug!("Creating [{}] zones", zone_count);
        Self {
            device: DeviceState::new(),
            zones: (1..=zone_count).map(ZoneState::new).collect(),
        }
    }

    pub fn zone_count(&self) -> u8 {
        self.zones.len() as u8
    }

    pub fn device(&self) -> &DeviceState {
        &self.device
    }

    pub fn zones(&self) -> &[ZoneState] {
        &self.zones
    }

    /// Zone by 1-based number
    pub fn zone(&self, number: ZoneNumber) -> Option<&ZoneState> {
        let index = usize::from(number).checked_sub(1)?;
        self.zones.get(index)
    }

    fn zone_mut(&mut self, number: ZoneNumber) -> Option<&mut ZoneState> {
        let index = usize::from(number).checked_sub(1)?;
        self.zones.get_mut(index)
    }

    /// Firmware version every confirmation decision is gated on
    pub fn firmware(&self) -> u32 {
        self.device.firmware_version_int()
    }

    /// Decode one frame and apply it, returning the resulting changes
    pub fn handle_frame(&mut self, frame: &InboundFrame) -> Vec<StateUpdate> {
        match parse_frame(frame, self.zone_count()) {
            Some(response) => self.apply(response),
            None => Vec::new(),
        }
    }

    /// Apply an already decoded response
    pub fn apply(&mut self, response: Response) -> Vec<StateUpdate> {
        match response {
            Response::DeviceStatus(report) => {
                let changes = self.device.apply(report);
                changes.into_iter().map(StateUpdate::Device).collect()
            }
            Response::Zone(report) => {
                let Some(value) = ZoneValue::from_report(&report) else {
                    tracing::debug!(
                        "Zone [{}] ignoring out-of-range {} value [{}]",
                        report.zone,
                        report.opcode,
                        report.value
                    );
                    return Vec::new();
                };
                let Some(zone) = self.zone_mut(report.zone) else {
                    return Vec::new();
                };
                tracing::debug!(
                    "Zone [{}] processing response of type [{}] with value [{}]",
                    report.zone,
                    report.opcode,
                    report.value
                );
                zone.apply(value)
                    .map(|value| StateUpdate::Zone {
                        zone: report.zone,
                        value,
                    })
                    .into_iter()
                    .collect()
            }
        }
    }

    /// Frames for a zone command; `None` when the zone does not exist
    pub fn command_frames(&self, zone: ZoneNumber, command: ZoneCommand) -> Option<Vec<String>> {
        let firmware = self.firmware();
        self.zone(zone)
            .map(|zone| zone.command_frames(command, firmware))
    }

    /// Frames of one full refresh pass: the device status request first,
    /// then every zone's queries
    pub fn refresh_frames(&self) -> Vec<String> {
        let firmware = self.firmware();
        let mut frames = vec![GlobalCommand::StatusRequest.frame().to_string()];
        for zone in &self.zones {
            frames.extend(zone.status_queries(firmware));
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceChange;
    use crate::types::PropertyValue;

    fn frame(text: &str) -> InboundFrame {
        InboundFrame::new(text, true)
    }

    #[test]
    fn test_zone_report_routes_to_owning_zone() {
        let mut state = HubState::new(6);
        let updates = state.handle_frame(&frame("?3VO12+"));
        assert_eq!(
            updates,
            vec![StateUpdate::Zone {
                zone: 3,
                value: ZoneValue::Volume(12)
            }]
        );
        assert_eq!(state.zone(3).map(|z| z.volume()), Some(12));
        assert_eq!(state.zone(1).map(|z| z.volume()), Some(0));
        assert_eq!(updates[0].property_name(), "ZoneVolumes");
        assert_eq!(updates[0].value(), PropertyValue::Int(12));
    }

    #[test]
    fn test_repeated_report_notifies_once() {
        let mut state = HubState::new(4);
        assert_eq!(state.handle_frame(&frame("?1BA1+")).len(), 1);
        assert!(state.handle_frame(&frame("?1BA1+")).is_empty());
        assert_eq!(state.zone(1).map(|z| z.balance()), Some(-5));
    }

    #[test]
    fn test_report_for_unconfigured_zone_is_dropped() {
        let mut state = HubState::new(4);
        assert!(state.handle_frame(&frame("?6PR1+")).is_empty());
        assert!(state.handle_frame(&frame("?1VO99+")).is_empty());
    }

    #[test]
    fn test_firmware_from_status_gates_zone_queries() {
        let mut state = HubState::new(4);
        assert_eq!(
            state.command_frames(1, ZoneCommand::SetMute(true)),
            Some(vec!["!1MU1+".to_string()])
        );

        let updates = state.handle_frame(&frame("?SIDevice: DIGI-5,Firmware Ver: 10.9+"));
        assert_eq!(updates.len(), 2);
        assert_eq!(
            updates[1],
            StateUpdate::Device(DeviceChange::FirmwareVersion {
                raw: "10.9".into(),
                derived: 109
            })
        );
        assert_eq!(state.firmware(), 109);
        assert_eq!(
            state.command_frames(1, ZoneCommand::SetMute(true)),
            Some(vec!["!1MU1+".to_string(), "?1MU+".to_string()])
        );
    }

    #[test]
    fn test_command_for_unknown_zone() {
        let state = HubState::new(6);
        assert_eq!(state.command_frames(7, ZoneCommand::TogglePower), None);
        assert_eq!(state.command_frames(0, ZoneCommand::TogglePower), None);
    }

    #[test]
    fn test_refresh_frames_start_with_status_request() {
        let state = HubState::new(4);
        assert_eq!(
            state.refresh_frames(),
            vec!["?SI+", "?1SS+", "?2SS+", "?3SS+", "?4SS+"]
        );
    }
}
