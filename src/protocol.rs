use crate::types::ZoneNumber;
use std::fmt;

/// Frame delimiter used in both directions
pub const DELIMITER: char = '+';

/// Prefix of an outbound command frame
pub const COMMAND_PREFIX: char = '!';

/// Prefix of an outbound query frame and of every inbound report
pub const QUERY_PREFIX: char = '?';

/// Two-letter codes of the zone properties the hub reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Power,
    Source,
    Volume,
    Mute,
    Treble,
    Bass,
    Balance,
}

impl Opcode {
    /// Every reportable opcode
    pub const ALL: [Opcode; 7] = [
        Opcode::Power,
        Opcode::Source,
        Opcode::Volume,
        Opcode::Mute,
        Opcode::Treble,
        Opcode::Bass,
        Opcode::Balance,
    ];

    /// Wire code
    pub fn as_str(&self) -> &'static str {
        match self {
            Opcode::Power => "PR",
            Opcode::Source => "SS",
            Opcode::Volume => "VO",
            Opcode::Mute => "MU",
            Opcode::Treble => "TR",
            Opcode::Bass => "BS",
            Opcode::Balance => "BA",
        }
    }

    /// Parse a wire code; unknown codes yield `None`
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "PR" => Some(Opcode::Power),
            "SS" => Some(Opcode::Source),
            "VO" => Some(Opcode::Volume),
            "MU" => Some(Opcode::Mute),
            "TR" => Some(Opcode::Treble),
            "BS" => Some(Opcode::Bass),
            "BA" => Some(Opcode::Balance),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hub-wide frames not addressed to a single zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalCommand {
    /// `!AO+` - power off every zone
    AllOff,
    /// `?DI+` - liveness probe
    Ping,
    /// `?SI+` - full device status block
    StatusRequest,
}

impl GlobalCommand {
    /// Complete frame including delimiter
    pub fn frame(&self) -> &'static str {
        match self {
            GlobalCommand::AllOff => "!AO+",
            GlobalCommand::Ping => "?DI+",
            GlobalCommand::StatusRequest => "?SI+",
        }
    }
}

/// Build `!<zone><code><value?>+`
pub fn command_frame(zone: ZoneNumber, code: &str, value: Option<&str>) -> String {
    format!(
        "{}{}{}{}{}",
        COMMAND_PREFIX,
        zone,
        code,
        value.unwrap_or_default(),
        DELIMITER
    )
}

/// Build `?<zone><OP>+`
pub fn query_frame(zone: ZoneNumber, opcode: Opcode) -> String {
    format!("{}{}{}{}", QUERY_PREFIX, zone, opcode.as_str(), DELIMITER)
}

/// Wire form of a boolean argument
pub fn bool_value(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_frame_with_value() {
        assert_eq!(command_frame(1, "VO", Some("15")), "!1VO15+");
        assert_eq!(command_frame(6, "PR", Some(bool_value(true))), "!6PR1+");
    }

    #[test]
    fn test_command_frame_without_value() {
        assert_eq!(command_frame(3, "VI", None), "!3VI+");
        assert_eq!(command_frame(2, "MT", None), "!2MT+");
    }

    #[test]
    fn test_query_frame() {
        assert_eq!(query_frame(1, Opcode::Source), "?1SS+");
        assert_eq!(query_frame(4, Opcode::Balance), "?4BA+");
    }

    #[test]
    fn test_global_frames() {
        assert_eq!(GlobalCommand::AllOff.frame(), "!AO+");
        assert_eq!(GlobalCommand::Ping.frame(), "?DI+");
        assert_eq!(GlobalCommand::StatusRequest.frame(), "?SI+");
    }

    #[test]
    fn test_opcode_codes() {
        for opcode in Opcode::ALL {
            assert_eq!(Opcode::from_code(opcode.as_str()), Some(opcode));
        }
        assert_eq!(Opcode::from_code("XX"), None);
        assert_eq!(Opcode::from_code("DI"), None);
    }
}
