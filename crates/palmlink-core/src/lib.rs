//! palmlink-core — Gesture-to-command dispatch for a serial-driven robot.
//!
//! Maps recognized hand gestures to controller commands, sends them over a
//! [`Transport`], and returns the gimbal to neutral after momentary gestures.

pub mod dispatch;
pub mod recognizer;
pub mod table;
pub mod transport;
pub mod types;

pub use dispatch::{decide, Decision, Dispatcher, Outcome, RESET_DELAY};
pub use recognizer::{top_label, GestureClassifier, GestureRecognizer};
pub use table::{CommandTable, NEUTRAL_COMMAND};
pub use transport::{Transport, TransportError};
pub use types::{Command, Gesture, GestureLabel};
