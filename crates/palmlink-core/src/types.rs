use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Controller message type for the LED channel command.
pub const LED_CTRL: u16 = 132;
/// Controller message type for the pan/tilt gimbal command.
pub const GIMBAL_CTRL: u16 = 133;

/// Hand gesture categories emitted by the recognizer, in model class order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GestureLabel {
    Unknown,
    ClosedFist,
    OpenPalm,
    PointingUp,
    ThumbDown,
    ThumbUp,
    Victory,
    ILoveYou,
}

impl GestureLabel {
    /// Every label, indexed by model class.
    pub const ALL: [GestureLabel; 8] = [
        GestureLabel::Unknown,
        GestureLabel::ClosedFist,
        GestureLabel::OpenPalm,
        GestureLabel::PointingUp,
        GestureLabel::ThumbDown,
        GestureLabel::ThumbUp,
        GestureLabel::Victory,
        GestureLabel::ILoveYou,
    ];

    /// Label for a model output class index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Model output class index of this label.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Category name as reported by the recognizer (e.g. `"Thumb_Up"`).
    pub fn category_name(self) -> &'static str {
        match self {
            GestureLabel::Unknown => "Unknown",
            GestureLabel::ClosedFist => "Closed_Fist",
            GestureLabel::OpenPalm => "Open_Palm",
            GestureLabel::PointingUp => "Pointing_Up",
            GestureLabel::ThumbDown => "Thumb_Down",
            GestureLabel::ThumbUp => "Thumb_Up",
            GestureLabel::Victory => "Victory",
            GestureLabel::ILoveYou => "ILoveYou",
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gesture category: {0}")]
pub struct ParseLabelError(pub String);

impl FromStr for GestureLabel {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.category_name() == s)
            .ok_or_else(|| ParseLabelError(s.to_string()))
    }
}

/// One ranked recognizer candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gesture {
    pub label: GestureLabel,
    /// Softmax score in [0, 1].
    pub score: f32,
}

/// Two-channel LED instruction. Channel values are PWM duty (0 = off, 255 = full).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedCommand {
    #[serde(rename = "T")]
    pub kind: u16,
    #[serde(rename = "IO4")]
    pub io4: u8,
    #[serde(rename = "IO5")]
    pub io5: u8,
}

impl LedCommand {
    pub const fn new(io4: u8, io5: u8) -> Self {
        Self {
            kind: LED_CTRL,
            io4,
            io5,
        }
    }
}

/// Pan/tilt target in degrees, with speed and acceleration (0 = controller default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GimbalCommand {
    #[serde(rename = "T")]
    pub kind: u16,
    #[serde(rename = "X")]
    pub x: i16,
    #[serde(rename = "Y")]
    pub y: i16,
    #[serde(rename = "SPD")]
    pub speed: u16,
    #[serde(rename = "ACC")]
    pub accel: u16,
}

impl GimbalCommand {
    pub const fn new(x: i16, y: i16, speed: u16, accel: u16) -> Self {
        Self {
            kind: GIMBAL_CTRL,
            x,
            y,
            speed,
            accel,
        }
    }
}

/// An actuator instruction for the robot controller.
///
/// Serializes to the controller's flat JSON object, e.g.
/// `{"T":133,"X":-30,"Y":180,"SPD":0,"ACC":0}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    Led(LedCommand),
    Gimbal(GimbalCommand),
}

impl Command {
    /// Encode as one newline-terminated JSON line, ready for the wire.
    pub fn to_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_index_roundtrip() {
        for (i, label) in GestureLabel::ALL.iter().enumerate() {
            assert_eq!(label.index(), i);
            assert_eq!(GestureLabel::from_index(i), Some(*label));
        }
        assert_eq!(GestureLabel::from_index(8), None);
    }

    #[test]
    fn test_label_parse_category_names() {
        assert_eq!("Thumb_Up".parse::<GestureLabel>(), Ok(GestureLabel::ThumbUp));
        assert_eq!("ILoveYou".parse::<GestureLabel>(), Ok(GestureLabel::ILoveYou));
        assert_eq!("Open_Palm".parse::<GestureLabel>(), Ok(GestureLabel::OpenPalm));
        assert!("thumb_up".parse::<GestureLabel>().is_err());
        assert!("None".parse::<GestureLabel>().is_err());
    }

    #[test]
    fn test_label_display_is_category_name() {
        assert_eq!(GestureLabel::ClosedFist.to_string(), "Closed_Fist");
        assert_eq!(GestureLabel::PointingUp.to_string(), "Pointing_Up");
    }

    #[test]
    fn test_led_wire_format() {
        let cmd = Command::Led(LedCommand::new(255, 255));
        let line = cmd.to_line().unwrap();
        assert_eq!(line, b"{\"T\":132,\"IO4\":255,\"IO5\":255}\n".to_vec());
    }

    #[test]
    fn test_gimbal_wire_format_preserves_key_order() {
        let cmd = Command::Gimbal(GimbalCommand::new(-30, 180, 0, 0));
        assert_eq!(cmd.to_string(), r#"{"T":133,"X":-30,"Y":180,"SPD":0,"ACC":0}"#);
    }

    #[test]
    fn test_line_is_single_line() {
        let cmd = Command::Gimbal(GimbalCommand::new(-90, -30, 0, 0));
        let line = cmd.to_line().unwrap();
        assert_eq!(line.iter().filter(|&&b| b == b'\n').count(), 1);
        assert_eq!(line.last(), Some(&b'\n'));
    }

    #[test]
    fn test_untagged_parse_picks_variant_by_keys() {
        let led: Command = serde_json::from_str(r#"{"T":132,"IO4":0,"IO5":0}"#).unwrap();
        assert_eq!(led, Command::Led(LedCommand::new(0, 0)));

        let gimbal: Command =
            serde_json::from_str(r#"{"T":133,"X":180,"Y":0,"SPD":0,"ACC":0}"#).unwrap();
        assert_eq!(gimbal, Command::Gimbal(GimbalCommand::new(180, 0, 0, 0)));
    }
}
