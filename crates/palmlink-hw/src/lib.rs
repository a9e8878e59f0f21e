//! palmlink-hw — Hardware abstraction for camera capture and the serial link.
//!
//! Provides V4L2-based RGB frame capture and a termios-configured serial
//! port for the robot controller.

pub mod camera;
pub mod frame;
pub mod serial;

pub use camera::{Camera, CameraError, PixelFormat};
pub use frame::Frame;
pub use serial::{SerialConfig, SerialError, SerialPort};
