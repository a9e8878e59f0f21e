use palmlink_hw::SerialConfig;
use std::time::Duration;

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Path to the gesture classifier ONNX model.
    pub model_path: String,
    /// Minimum softmax score for a gesture to count as detected.
    pub min_confidence: f32,
    /// Number of warmup frames to discard at startup (camera AGC/AE stabilization).
    pub warmup_frames: usize,
    /// Serial device wired to the robot controller.
    pub serial_port: String,
    pub baud_rate: u32,
    /// Upper bound on one command write.
    pub write_timeout: Duration,
    /// Pause after each command so the controller can consume it.
    pub settle: Duration,
}

impl Config {
    /// Load configuration from `PALMLINK_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            camera_device: env_string("PALMLINK_CAMERA_DEVICE", "/dev/video0"),
            model_path: env_string("PALMLINK_MODEL_PATH", "models/gesture_recognizer.onnx"),
            min_confidence: env_parse("PALMLINK_MIN_CONFIDENCE", 0.5),
            warmup_frames: env_parse("PALMLINK_WARMUP_FRAMES", 4),
            serial_port: env_string("PALMLINK_SERIAL_PORT", "/dev/ttymxc3"),
            baud_rate: env_parse("PALMLINK_BAUD_RATE", 115_200),
            write_timeout: Duration::from_millis(env_parse("PALMLINK_WRITE_TIMEOUT_MS", 1000)),
            settle: Duration::from_millis(env_parse("PALMLINK_SETTLE_MS", 100)),
        }
    }

    /// Line settings for the controller's serial port.
    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            baud_rate: self.baud_rate,
            write_timeout: self.write_timeout,
            settle: self.settle,
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        // Keys nobody sets, so parallel tests can't interfere.
        assert_eq!(env_parse("PALMLINK_TEST_UNSET_U32", 115_200u32), 115_200);
        assert_eq!(env_string("PALMLINK_TEST_UNSET_STR", "/dev/video0"), "/dev/video0");
    }

    #[test]
    fn test_parse_override() {
        std::env::set_var("PALMLINK_TEST_CONFIDENCE", "0.75");
        assert_eq!(env_parse("PALMLINK_TEST_CONFIDENCE", 0.5f32), 0.75);
        std::env::remove_var("PALMLINK_TEST_CONFIDENCE");
    }

    #[test]
    fn test_unparseable_falls_back() {
        std::env::set_var("PALMLINK_TEST_BAUD", "fast");
        assert_eq!(env_parse("PALMLINK_TEST_BAUD", 115_200u32), 115_200);
        std::env::remove_var("PALMLINK_TEST_BAUD");
    }

    #[test]
    fn test_serial_config_carries_durations() {
        let config = Config {
            camera_device: "/dev/video0".into(),
            model_path: "m.onnx".into(),
            min_confidence: 0.5,
            warmup_frames: 0,
            serial_port: "/dev/ttyUSB0".into(),
            baud_rate: 57_600,
            write_timeout: Duration::from_millis(250),
            settle: Duration::from_millis(20),
        };
        let serial = config.serial_config();
        assert_eq!(serial.baud_rate, 57_600);
        assert_eq!(serial.write_timeout, Duration::from_millis(250));
        assert_eq!(serial.settle, Duration::from_millis(20));
    }
}
