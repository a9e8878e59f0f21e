//! V4L2 camera capture via the `v4l` crate.

use crate::frame::{self, Frame};
use std::ops::ControlFlow;
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

const CAPTURE_WIDTH: u32 = 640;
const CAPTURE_HEIGHT: u32 = 480;
const STREAM_BUFFERS: u32 = 4;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("streaming not supported")]
    StreamingNotSupported,
}

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
}

/// Negotiated pixel format for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel), the common webcam default.
    Yuyv,
    /// Packed RGB, 3 bytes/pixel.
    Rgb24,
    /// Packed BGR, 3 bytes/pixel.
    Bgr24,
}

impl PixelFormat {
    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        if fourcc == FourCC::new(b"YUYV") {
            Some(PixelFormat::Yuyv)
        } else if fourcc == FourCC::new(b"RGB3") {
            Some(PixelFormat::Rgb24)
        } else if fourcc == FourCC::new(b"BGR3") {
            Some(PixelFormat::Bgr24)
        } else {
            None
        }
    }
}

/// V4L2 camera device handle.
pub struct Camera {
    device: Device,
    pub width: u32,
    pub height: u32,
    pub device_path: String,
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open a V4L2 camera device by path (e.g., "/dev/video0").
    pub fn open(device_path: &str) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path)
            .map_err(|e| CameraError::CaptureFailed(format!("failed to open {device_path}: {e}")))?;

        let caps = device.query_caps().map_err(|e| {
            CameraError::CaptureFailed(format!("failed to query capabilities: {e}"))
        })?;

        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );

        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::StreamingNotSupported);
        }

        // Ask for YUYV; accept packed RGB/BGR if the driver prefers it.
        let mut fmt = device.format().map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;

        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = CAPTURE_WIDTH;
        fmt.height = CAPTURE_HEIGHT;

        let negotiated = device.set_format(&fmt).map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to set format: {e}"))
        })?;

        let fourcc = negotiated.fourcc;
        let pixel_format = PixelFormat::from_fourcc(fourcc).ok_or_else(|| {
            CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {fourcc:?} (need YUYV, RGB3, or BGR3)"
            ))
        })?;

        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            format = ?pixel_format,
            "negotiated format"
        );

        Ok(Self {
            device,
            width: negotiated.width,
            height: negotiated.height,
            device_path: device_path.to_string(),
            pixel_format,
        })
    }

    /// Stream frames into `on_frame` until it breaks or capture fails.
    ///
    /// Returns `Ok(())` when the callback stops the stream, and the capture
    /// error otherwise: a camera that stops delivering frames ends the stream.
    pub fn stream<F>(&self, mut on_frame: F) -> Result<(), CameraError>
    where
        F: FnMut(Frame) -> ControlFlow<()>,
    {
        let mut stream = MmapStream::with_buffers(&self.device, BufType::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| CameraError::CaptureFailed(format!("failed to create mmap stream: {e}")))?;

        loop {
            let (buf, meta) = stream.next().map_err(|e| {
                CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}"))
            })?;

            let rgb = self.buf_to_rgb(buf)?;
            let frame = Frame {
                data: rgb,
                width: self.width,
                height: self.height,
                timestamp: std::time::Instant::now(),
                sequence: meta.sequence,
            };

            if on_frame(frame).is_break() {
                return Ok(());
            }
        }
    }

    /// Convert a raw buffer to packed RGB based on the negotiated format.
    fn buf_to_rgb(&self, buf: &[u8]) -> Result<Vec<u8>, CameraError> {
        let pixels = (self.width * self.height) as usize;

        match self.pixel_format {
            PixelFormat::Yuyv => frame::yuyv_to_rgb(buf, self.width, self.height)
                .map_err(|e| CameraError::CaptureFailed(format!("YUYV conversion failed: {e}"))),
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => {
                let expected = pixels * 3;
                if buf.len() < expected {
                    return Err(CameraError::CaptureFailed(format!(
                        "{:?} buffer too short: expected {expected}, got {}",
                        self.pixel_format,
                        buf.len()
                    )));
                }
                let mut rgb = buf[..expected].to_vec();
                if self.pixel_format == PixelFormat::Bgr24 {
                    frame::bgr_to_rgb_in_place(&mut rgb);
                }
                Ok(rgb)
            }
        }
    }

    /// Capture-capable V4L2 nodes among /dev/video0../dev/video15, for
    /// pointing the user at the right device when the configured one fails.
    pub fn list_devices() -> Vec<DeviceInfo> {
        (0..16)
            .map(|i| format!("/dev/video{i}"))
            .filter(|path| Path::new(path).exists())
            .filter_map(|path| {
                let caps = Device::with_path(&path).ok()?.query_caps().ok()?;
                caps.capabilities
                    .contains(v4l::capability::Flags::VIDEO_CAPTURE)
                    .then(|| DeviceInfo {
                        path,
                        name: caps.card,
                        driver: caps.driver,
                    })
            })
            .collect()
    }
}
