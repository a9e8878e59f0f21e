//! Static gesture → command table.

use crate::types::{Command, GestureLabel, GimbalCommand, LedCommand};
use std::collections::HashMap;

/// Gimbal back to center, sent when a momentary gesture's reset expires.
pub const NEUTRAL_COMMAND: Command = Command::Gimbal(GimbalCommand::new(0, 0, 0, 0));

/// How long a command's physical effect should last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Sets lasting state (LED on/off); never auto-reverts.
    Persistent,
    /// Transient pose; reverts to neutral after the reset delay.
    Momentary,
}

/// A command bound to a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub command: Command,
    pub mode: Mode,
}

impl Binding {
    pub fn is_momentary(&self) -> bool {
        self.mode == Mode::Momentary
    }
}

/// Immutable mapping from gesture to actuator command.
#[derive(Debug, Clone)]
pub struct CommandTable {
    bindings: HashMap<GestureLabel, Binding>,
    neutral: Command,
}

impl CommandTable {
    /// The stock robot mapping: palm/fist toggle the LEDs, the remaining
    /// recognized poses swing the gimbal.
    pub fn standard() -> Self {
        use GestureLabel::*;
        use Mode::*;

        let entries = [
            (OpenPalm, Command::Led(LedCommand::new(255, 255)), Persistent),
            (ClosedFist, Command::Led(LedCommand::new(0, 0)), Persistent),
            // Shy: turn left, look down
            (ILoveYou, Command::Gimbal(GimbalCommand::new(-90, -30, 0, 0)), Momentary),
            (ThumbUp, Command::Gimbal(GimbalCommand::new(-30, 180, 0, 0)), Momentary),
            (ThumbDown, Command::Gimbal(GimbalCommand::new(-30, -30, 0, 0)), Momentary),
            (Victory, Command::Gimbal(GimbalCommand::new(180, 0, 0, 0)), Momentary),
        ];

        let bindings = entries
            .into_iter()
            .map(|(label, command, mode)| (label, Binding { command, mode }))
            .collect();

        Self {
            bindings,
            neutral: NEUTRAL_COMMAND,
        }
    }

    /// Binding for `label`, or `None` when the gesture maps to nothing.
    pub fn lookup(&self, label: GestureLabel) -> Option<&Binding> {
        self.bindings.get(&label)
    }

    pub fn is_momentary(&self, label: GestureLabel) -> bool {
        self.lookup(label).is_some_and(Binding::is_momentary)
    }

    /// The rest position sent on reset expiry.
    pub fn neutral(&self) -> Command {
        self.neutral
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::standard()
    }
}
