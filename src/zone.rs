use crate::parser::ZoneReport;
use crate::protocol::{bool_value, command_frame, query_frame, Opcode};
use crate::types::{PropertyValue, SourceNumber, ToneLevel, VolumeLevel, ZoneNumber};
use serde::{Deserialize, Serialize};

/// Firmware versions below this corrupt replies to confirmation queries
pub const FIRMWARE_GATE: u32 = 109;

/// Offset between wire (1..=11) and logical (-5..=5) balance, bass and treble
pub const TONE_OFFSET: i32 = 6;
pub const TONE_WIRE_MIN: i32 = 1;
pub const TONE_WIRE_MAX: i32 = 11;

/// Offset applied when sending a balance command.
///
/// The hub accepts `logical + 5` on `BA` commands while reporting
/// `logical + 6`; bass and treble commands take the logical value as is.
pub const BALANCE_COMMAND_OFFSET: i32 = 5;

pub const MIN_VOLUME: i32 = 0;
pub const MAX_VOLUME: i32 = 21;

/// Logical number of the zone's local input
pub const LOCAL_SOURCE: SourceNumber = 5;
/// Wire sentinel for the local input
pub const LOCAL_SOURCE_WIRE: i32 = 9;
pub const MIN_SOURCE: i32 = 1;
pub const MAX_BUS_SOURCE: i32 = 4;

/// Query order of a full zone refresh
const REFRESH_ORDER: [Opcode; 7] = [
    Opcode::Balance,
    Opcode::Bass,
    Opcode::Mute,
    Opcode::Power,
    Opcode::Treble,
    Opcode::Source,
    Opcode::Volume,
];

/// Wire value of a logical source, `None` when out of range
pub fn encode_source(source: i32) -> Option<i32> {
    match source {
        MIN_SOURCE..=MAX_BUS_SOURCE => Some(source),
        s if s == LOCAL_SOURCE as i32 => Some(LOCAL_SOURCE_WIRE),
        _ => None,
    }
}

/// Logical source of a wire value
pub fn decode_source(wire: i32) -> i32 {
    if wire == LOCAL_SOURCE_WIRE {
        LOCAL_SOURCE as i32
    } else {
        wire
    }
}

/// Logical balance/bass/treble of a wire value
pub fn decode_tone(wire: i32) -> i32 {
    wire - TONE_OFFSET
}

/// Whether a logical balance/bass/treble lands inside the wire range
pub fn tone_in_range(level: i32) -> bool {
    (TONE_WIRE_MIN..=TONE_WIRE_MAX).contains(&(level + TONE_OFFSET))
}

pub fn volume_in_range(volume: i32) -> bool {
    (MIN_VOLUME..=MAX_VOLUME).contains(&volume)
}

/// A typed zone property value, used both for decoded reports and for
/// change notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneValue {
    Power(bool),
    Mute(bool),
    Source(SourceNumber),
    Volume(VolumeLevel),
    Balance(ToneLevel),
    Bass(ToneLevel),
    Treble(ToneLevel),
}

impl ZoneValue {
    /// Convert a raw report into a logical value.
    ///
    /// Reports whose converted value falls outside the logical range are
    /// rejected.
    pub fn from_report(report: &ZoneReport) -> Option<Self> {
        let raw = report.value;
        let value = match report.opcode {
            Opcode::Power => ZoneValue::Power(raw == 1),
            Opcode::Mute => ZoneValue::Mute(raw == 1),
            Opcode::Source => {
                if !(MIN_SOURCE..=MAX_BUS_SOURCE).contains(&raw) && raw != LOCAL_SOURCE_WIRE {
                    return None;
                }
                ZoneValue::Source(decode_source(raw) as SourceNumber)
            }
            Opcode::Volume => {
                if !volume_in_range(raw) {
                    return None;
                }
                ZoneValue::Volume(raw as VolumeLevel)
            }
            Opcode::Balance | Opcode::Bass | Opcode::Treble => {
                if !(TONE_WIRE_MIN..=TONE_WIRE_MAX).contains(&raw) {
                    return None;
                }
                let level = decode_tone(raw) as ToneLevel;
                match report.opcode {
                    Opcode::Balance => ZoneValue::Balance(level),
                    Opcode::Bass => ZoneValue::Bass(level),
                    _ => ZoneValue::Treble(level),
                }
            }
        };
        Some(value)
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            ZoneValue::Power(_) => Opcode::Power,
            ZoneValue::Mute(_) => Opcode::Mute,
            ZoneValue::Source(_) => Opcode::Source,
            ZoneValue::Volume(_) => Opcode::Volume,
            ZoneValue::Balance(_) => Opcode::Balance,
            ZoneValue::Bass(_) => Opcode::Bass,
            ZoneValue::Treble(_) => Opcode::Treble,
        }
    }

    /// Host-facing property name
    pub fn property_name(&self) -> &'static str {
        match self {
            ZoneValue::Power(_) => "ZonePowerStates",
            ZoneValue::Mute(_) => "ZoneMuteStates",
            ZoneValue::Source(_) => "ZoneSources",
            ZoneValue::Volume(_) => "ZoneVolumes",
            ZoneValue::Balance(_) => "ZoneBalances",
            ZoneValue::Bass(_) => "ZoneBassLevels",
            ZoneValue::Treble(_) => "ZoneTrebleLevels",
        }
    }

    pub fn value(&self) -> PropertyValue {
        match *self {
            ZoneValue::Power(v) | ZoneValue::Mute(v) => v.into(),
            ZoneValue::Source(v) | ZoneValue::Volume(v) => i32::from(v).into(),
            ZoneValue::Balance(v) | ZoneValue::Bass(v) | ZoneValue::Treble(v) => {
                i32::from(v).into()
            }
        }
    }
}

/// Operations a host can issue against one zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneCommand {
    SetPower(bool),
    TogglePower,
    SetMute(bool),
    ToggleMute,
    SetSource(i32),
    IncrementSource,
    DecrementSource,
    SetVolume(i32),
    IncrementVolume,
    DecrementVolume,
    SetBalance(i32),
    StepBalanceLeft,
    StepBalanceRight,
    SetBassLevel(i32),
    IncrementBass,
    DecrementBass,
    SetTrebleLevel(i32),
    IncrementTreble,
    DecrementTreble,
    SetDoNotDisturb(bool),
    SetDynamicRangeControl(bool),
    SetLoudness(bool),
    SetWholeHouseMode(bool),
}

impl ZoneCommand {
    /// Wire frame for this command, or `None` when the argument is out of range
    pub fn frame(&self, zone: ZoneNumber) -> Option<String> {
        use ZoneCommand::*;

        let frame = match *self {
            SetPower(on) => command_frame(zone, "PR", Some(bool_value(on))),
            TogglePower => command_frame(zone, "PT", None),
            SetMute(muted) => command_frame(zone, "MU", Some(bool_value(muted))),
            ToggleMute => command_frame(zone, "MT", None),
            SetSource(source) => {
                let wire = encode_source(source)?;
                command_frame(zone, "SS", Some(&wire.to_string()))
            }
            IncrementSource => command_frame(zone, "SI", None),
            DecrementSource => command_frame(zone, "SD", None),
            SetVolume(volume) => {
                if !volume_in_range(volume) {
                    return None;
                }
                command_frame(zone, "VO", Some(&volume.to_string()))
            }
            IncrementVolume => command_frame(zone, "VI", None),
            DecrementVolume => command_frame(zone, "VD", None),
            SetBalance(balance) => {
                if !tone_in_range(balance) {
                    return None;
                }
                let wire = balance + BALANCE_COMMAND_OFFSET;
                command_frame(zone, "BA", Some(&wire.to_string()))
            }
            StepBalanceLeft => command_frame(zone, "BL", None),
            StepBalanceRight => command_frame(zone, "BR", None),
            SetBassLevel(level) => {
                if !tone_in_range(level) {
                    return None;
                }
                command_frame(zone, "BS", Some(&level.to_string()))
            }
            IncrementBass => command_frame(zone, "BI", None),
            DecrementBass => command_frame(zone, "BD", None),
            SetTrebleLevel(level) => {
                if !tone_in_range(level) {
                    return None;
                }
                command_frame(zone, "TR", Some(&level.to_string()))
            }
            IncrementTreble => command_frame(zone, "TI", None),
            DecrementTreble => command_frame(zone, "TD", None),
            SetDoNotDisturb(on) => command_frame(zone, "DD", Some(bool_value(on))),
            SetDynamicRangeControl(on) => command_frame(zone, "DR", Some(bool_value(on))),
            SetLoudness(on) => command_frame(zone, "LO", Some(bool_value(on))),
            SetWholeHouseMode(on) => command_frame(zone, "WH", Some(bool_value(on))),
        };
        Some(frame)
    }

    /// Property re-queried after the command is sent
    pub fn confirms(&self) -> Option<Opcode> {
        use ZoneCommand::*;

        match self {
            SetPower(_) | TogglePower => Some(Opcode::Power),
            SetMute(_) | ToggleMute => Some(Opcode::Mute),
            SetSource(_) | IncrementSource | DecrementSource => Some(Opcode::Source),
            SetVolume(_) | IncrementVolume | DecrementVolume => Some(Opcode::Volume),
            SetBalance(_) | StepBalanceLeft | StepBalanceRight => Some(Opcode::Balance),
            SetBassLevel(_) | IncrementBass | DecrementBass => Some(Opcode::Bass),
            SetTrebleLevel(_) | IncrementTreble | DecrementTreble => Some(Opcode::Treble),
            // No query opcode exists for these
            SetDoNotDisturb(_) | SetDynamicRangeControl(_) | SetLoudness(_)
            | SetWholeHouseMode(_) => None,
        }
    }
}

/// Whether a confirmation query for `opcode` may be sent to a hub running
/// `firmware`. Source queries are unaffected by the firmware defect.
pub fn confirmation_allowed(opcode: Opcode, firmware: u32) -> bool {
    opcode == Opcode::Source || firmware >= FIRMWARE_GATE
}

/// Current values of one zone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneState {
    number: ZoneNumber,
    is_power_on: bool,
    is_muted: bool,
    source: SourceNumber,
    volume: VolumeLevel,
    balance: ToneLevel,
    bass_level: ToneLevel,
    treble_level: ToneLevel,
}

impl ZoneState {
    pub fn new(number: ZoneNumber) -> Self {
        Self {
            number,
            ..Default::default()
        }
    }

    pub fn number(&self) -> ZoneNumber {
        self.number
    }

    pub fn is_power_on(&self) -> bool {
        self.is_power_on
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn source(&self) -> SourceNumber {
        self.source
    }

    pub fn volume(&self) -> VolumeLevel {
        self.volume
    }

    pub fn balance(&self) -> ToneLevel {
        self.balance
    }

    pub fn bass_level(&self) -> ToneLevel {
        self.bass_level
    }

    pub fn treble_level(&self) -> ToneLevel {
        self.treble_level
    }

    /// Current value of one property
    pub fn get(&self, opcode: Opcode) -> ZoneValue {
        match opcode {
            Opcode::Power => ZoneValue::Power(self.is_power_on),
            Opcode::Mute => ZoneValue::Mute(self.is_muted),
            Opcode::Source => ZoneValue::Source(self.source),
            Opcode::Volume => ZoneValue::Volume(self.volume),
            Opcode::Balance => ZoneValue::Balance(self.balance),
            Opcode::Bass => ZoneValue::Bass(self.bass_level),
            Opcode::Treble => ZoneValue::Treble(self.treble_level),
        }
    }

    /// Store a decoded value. Returns the value when it differs from the
    /// stored one, `None` when the report repeats what is already known.
    pub fn apply(&mut self, value: ZoneValue) -> Option<ZoneValue> {
        let changed = match value {
            ZoneValue::Power(v) => replace(&mut self.is_power_on, v),
            ZoneValue::Mute(v) => replace(&mut self.is_muted, v),
            ZoneValue::Source(v) => replace(&mut self.source, v),
            ZoneValue::Volume(v) => replace(&mut self.volume, v),
            ZoneValue::Balance(v) => replace(&mut self.balance, v),
            ZoneValue::Bass(v) => replace(&mut self.bass_level, v),
            ZoneValue::Treble(v) => replace(&mut self.treble_level, v),
        };
        changed.then_some(value)
    }

    /// Frames to send for `command`: the command itself followed by its
    /// confirmation query when the firmware allows it. Empty when the
    /// argument is out of range.
    pub fn command_frames(&self, command: ZoneCommand, firmware: u32) -> Vec<String> {
        let Some(frame) = command.frame(self.number) else {
            tracing::debug!("Zone [{}] dropping out-of-range command {:?}", self.number, command);
            return Vec::new();
        };

        let mut frames = vec![frame];
        if let Some(opcode) = command.confirms() {
            frames.extend(self.confirmation_query(opcode, firmware));
        }
        frames
    }

    /// Query for `opcode`, or `None` when gated by firmware
    pub fn confirmation_query(&self, opcode: Opcode, firmware: u32) -> Option<String> {
        confirmation_allowed(opcode, firmware).then(|| query_frame(self.number, opcode))
    }

    /// All queries of one refresh pass for this zone
    pub fn status_queries(&self, firmware: u32) -> Vec<String> {
        tracing::debug!("Updating Zone [{}] status", self.number);
        REFRESH_ORDER
            .iter()
            .filter_map(|opcode| self.confirmation_query(*opcode, firmware))
            .collect()
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(opcode: Opcode, value: i32) -> ZoneReport {
        ZoneReport {
            zone: 1,
            opcode,
            value,
        }
    }

    #[test]
    fn test_tone_decode_range() {
        let levels: Vec<i32> = (1..=11).map(decode_tone).collect();
        assert_eq!(levels, (-5..=5).collect::<Vec<i32>>());

        for opcode in [Opcode::Balance, Opcode::Bass, Opcode::Treble] {
            assert!(ZoneValue::from_report(&report(opcode, 0)).is_none());
            assert!(ZoneValue::from_report(&report(opcode, 12)).is_none());
        }
        assert_eq!(
            ZoneValue::from_report(&report(Opcode::Bass, 1)),
            Some(ZoneValue::Bass(-5))
        );
        assert_eq!(
            ZoneValue::from_report(&report(Opcode::Balance, 6)),
            Some(ZoneValue::Balance(0))
        );
    }

    #[test]
    fn test_source_mapping() {
        assert_eq!(encode_source(5), Some(9));
        assert_eq!(decode_source(9), 5);
        for source in 1..=4 {
            assert_eq!(encode_source(source), Some(source));
            assert_eq!(decode_source(source), source);
        }
        assert_eq!(encode_source(0), None);
        assert_eq!(encode_source(6), None);
        assert_eq!(encode_source(9), None);
    }

    #[test]
    fn test_source_report_accepts_only_wire_values() {
        assert_eq!(
            ZoneValue::from_report(&report(Opcode::Source, 9)),
            Some(ZoneValue::Source(5))
        );
        assert_eq!(
            ZoneValue::from_report(&report(Opcode::Source, 4)),
            Some(ZoneValue::Source(4))
        );
        for raw in [0, 5, 6, 8, 10] {
            assert!(ZoneValue::from_report(&report(Opcode::Source, raw)).is_none());
        }
    }

    #[test]
    fn test_notification_values() {
        assert_eq!(ZoneValue::Mute(true).value(), PropertyValue::Bool(true));
        assert_eq!(ZoneValue::Source(5).value(), PropertyValue::Int(5));
        assert_eq!(ZoneValue::Treble(-3).value(), PropertyValue::Int(-3));
    }

    #[test]
    fn test_volume_and_power_round_trip() {
        let zone = ZoneState::new(1);
        for volume in MIN_VOLUME..=MAX_VOLUME {
            let frame = ZoneCommand::SetVolume(volume).frame(zone.number()).unwrap();
            let wire: i32 = frame["!1VO".len()..frame.len() - 1].parse().unwrap();
            assert_eq!(
                ZoneValue::from_report(&report(Opcode::Volume, wire)),
                Some(ZoneValue::Volume(volume as u8))
            );
        }
        for on in [true, false] {
            let frame = ZoneCommand::SetPower(on).frame(1).unwrap();
            let wire: i32 = frame["!1PR".len()..frame.len() - 1].parse().unwrap();
            assert_eq!(
                ZoneValue::from_report(&report(Opcode::Power, wire)),
                Some(ZoneValue::Power(on))
            );
            let frame = ZoneCommand::SetMute(on).frame(1).unwrap();
            let wire: i32 = frame["!1MU".len()..frame.len() - 1].parse().unwrap();
            assert_eq!(
                ZoneValue::from_report(&report(Opcode::Mute, wire)),
                Some(ZoneValue::Mute(on))
            );
        }
    }

    #[test]
    fn test_apply_is_idempotent() {
        let samples = [
            (Opcode::Power, 1),
            (Opcode::Source, 9),
            (Opcode::Volume, 15),
            (Opcode::Mute, 1),
            (Opcode::Treble, 3),
            (Opcode::Bass, 11),
            (Opcode::Balance, 2),
        ];
        let mut zone = ZoneState::new(2);
        for (opcode, wire) in samples {
            let value = ZoneValue::from_report(&report(opcode, wire)).unwrap();
            assert_eq!(zone.apply(value), Some(value), "{} first report", opcode);
            assert_eq!(zone.apply(value), None, "{} repeated report", opcode);
            assert_eq!(zone.get(opcode), value);
        }
        assert!(zone.is_power_on());
        assert_eq!(zone.source(), LOCAL_SOURCE);
        assert_eq!(zone.bass_level(), 5);
        assert_eq!(zone.balance(), -4);
    }

    #[test]
    fn test_apply_default_value_is_not_a_change() {
        let mut zone = ZoneState::new(1);
        assert_eq!(zone.apply(ZoneValue::Volume(0)), None);
        assert_eq!(zone.apply(ZoneValue::Power(false)), None);
    }

    #[test]
    fn test_tone_commands() {
        assert_eq!(ZoneCommand::SetBalance(0).frame(1).as_deref(), Some("!1BA5+"));
        assert_eq!(ZoneCommand::SetBalance(-5).frame(1).as_deref(), Some("!1BA0+"));
        assert_eq!(ZoneCommand::SetBalance(6).frame(1), None);
        assert_eq!(ZoneCommand::SetBassLevel(-3).frame(2).as_deref(), Some("!2BS-3+"));
        assert_eq!(ZoneCommand::SetBassLevel(-6).frame(2), None);
        assert_eq!(ZoneCommand::SetTrebleLevel(5).frame(3).as_deref(), Some("!3TR5+"));
        assert_eq!(ZoneCommand::SetTrebleLevel(6).frame(3), None);
    }

    #[test]
    fn test_source_and_toggle_commands() {
        assert_eq!(ZoneCommand::SetSource(5).frame(4).as_deref(), Some("!4SS9+"));
        assert_eq!(ZoneCommand::SetSource(2).frame(4).as_deref(), Some("!4SS2+"));
        assert_eq!(ZoneCommand::SetSource(6).frame(4), None);
        assert_eq!(ZoneCommand::TogglePower.frame(1).as_deref(), Some("!1PT+"));
        assert_eq!(ZoneCommand::ToggleMute.frame(1).as_deref(), Some("!1MT+"));
        assert_eq!(ZoneCommand::SetLoudness(true).frame(1).as_deref(), Some("!1LO1+"));
        assert_eq!(ZoneCommand::SetDoNotDisturb(false).frame(1).as_deref(), Some("!1DD0+"));
    }

    #[test]
    fn test_out_of_range_volume_sends_nothing() {
        let zone = ZoneState::new(1);
        assert!(zone.command_frames(ZoneCommand::SetVolume(22), FIRMWARE_GATE).is_empty());
        assert!(zone.command_frames(ZoneCommand::SetVolume(-1), FIRMWARE_GATE).is_empty());
        assert_eq!(zone.volume(), 0);
    }

    #[test]
    fn test_firmware_gate() {
        let zone = ZoneState::new(1);
        let gated = [
            Opcode::Power,
            Opcode::Mute,
            Opcode::Volume,
            Opcode::Balance,
            Opcode::Bass,
            Opcode::Treble,
        ];
        for opcode in gated {
            assert_eq!(zone.confirmation_query(opcode, 108), None);
            assert_eq!(zone.confirmation_query(opcode, 109), Some(query_frame(1, opcode)));
        }
        assert_eq!(zone.confirmation_query(Opcode::Source, 108).as_deref(), Some("?1SS+"));
        assert_eq!(zone.confirmation_query(Opcode::Source, 109).as_deref(), Some("?1SS+"));
    }

    #[test]
    fn test_command_frames_include_confirmation() {
        let zone = ZoneState::new(3);
        assert_eq!(
            zone.command_frames(ZoneCommand::SetVolume(10), 109),
            vec!["!3VO10+".to_string(), "?3VO+".to_string()]
        );
        assert_eq!(
            zone.command_frames(ZoneCommand::SetVolume(10), 19),
            vec!["!3VO10+".to_string()]
        );
        assert_eq!(
            zone.command_frames(ZoneCommand::IncrementSource, 0),
            vec!["!3SI+".to_string(), "?3SS+".to_string()]
        );
        assert_eq!(
            zone.command_frames(ZoneCommand::SetWholeHouseMode(true), 200),
            vec!["!3WH1+".to_string()]
        );
    }

    #[test]
    fn test_status_queries() {
        let zone = ZoneState::new(2);
        assert_eq!(zone.status_queries(0), vec!["?2SS+".to_string()]);
        assert_eq!(
            zone.status_queries(109),
            vec!["?2BA+", "?2BS+", "?2MU+", "?2PR+", "?2TR+", "?2SS+", "?2VO+"]
        );
    }
}
