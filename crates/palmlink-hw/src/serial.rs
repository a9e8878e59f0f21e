//! Raw serial link to the robot controller over a tty.
//!
//! The port is configured raw 8N1 at a fixed baud rate via termios and opened
//! non-blocking, so every write is bounded by a poll timeout instead of
//! hanging on a stalled controller.

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::termios::{self, BaudRate, ControlFlags, FlushArg, SetArg};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerialError {
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: io::Error },
    #[error("unsupported baud rate: {0}")]
    UnsupportedBaud(u32),
    #[error("termios configuration failed: {0}")]
    Configure(#[from] nix::Error),
    #[error("poll failed: {0}")]
    Poll(nix::Error),
    #[error("write timed out after {0:?}")]
    Timeout(Duration),
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

/// Line settings for [`SerialPort::open`].
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baud_rate: u32,
    /// Upper bound on a single `write_line` call, excluding the settle pause.
    pub write_timeout: Duration,
    /// Pause after each line so the controller can consume it.
    pub settle: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            write_timeout: Duration::from_secs(1),
            settle: Duration::from_millis(100),
        }
    }
}

/// An open, configured serial port.
pub struct SerialPort {
    file: File,
    path: String,
    write_timeout: Duration,
    settle: Duration,
    /// A timed-out write left part of a line on the wire.
    torn: bool,
}

impl SerialPort {
    /// Open `path` (e.g. "/dev/ttymxc3") and configure it raw 8N1 at `config.baud_rate`.
    pub fn open(path: &str, config: &SerialConfig) -> Result<Self, SerialError> {
        let baud = baud_rate(config.baud_rate).ok_or(SerialError::UnsupportedBaud(config.baud_rate))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| SerialError::Open {
                path: path.to_string(),
                source,
            })?;

        let mut tio = termios::tcgetattr(file.as_fd())?;
        termios::cfmakeraw(&mut tio);
        termios::cfsetspeed(&mut tio, baud)?;
        tio.control_flags |= ControlFlags::CLOCAL | ControlFlags::CREAD;
        tio.control_flags &= !(ControlFlags::CSTOPB | ControlFlags::PARENB);
        termios::tcsetattr(file.as_fd(), SetArg::TCSANOW, &tio)?;

        tracing::info!(path, baud = config.baud_rate, "serial port opened");

        Ok(Self {
            file,
            path: path.to_string(),
            write_timeout: config.write_timeout,
            settle: config.settle,
            torn: false,
        })
    }

    /// Write one complete line, waiting at most the configured write timeout,
    /// then pause for the settle delay.
    ///
    /// If an earlier write timed out mid-line, a `\n` goes out first so the
    /// controller drops the fragment as one bad line instead of gluing it to
    /// this one.
    pub fn write_line(&mut self, line: &[u8]) -> Result<(), SerialError> {
        let deadline = Instant::now() + self.write_timeout;

        if self.torn {
            self.write_bounded(b"\n", deadline)?;
            self.torn = false;
            tracing::debug!(path = %self.path, "terminated partial line");
        }
        self.write_bounded(line, deadline)?;

        tracing::trace!(path = %self.path, bytes = line.len(), "line written");

        if !self.settle.is_zero() {
            std::thread::sleep(self.settle);
        }
        Ok(())
    }

    fn write_bounded(&mut self, bytes: &[u8], deadline: Instant) -> Result<(), SerialError> {
        let mut written = 0;

        while written < bytes.len() {
            match self.file.write(&bytes[written..]) {
                Ok(0) => return Err(SerialError::Io(io::ErrorKind::WriteZero.into())),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() || !self.wait_writable(remaining)? {
                        if written > 0 {
                            self.discard_partial(written, bytes.len());
                        }
                        return Err(SerialError::Timeout(self.write_timeout));
                    }
                }
                Err(e) => return Err(SerialError::Io(e)),
            }
        }
        Ok(())
    }

    /// Drop whatever of a half-written line is still queued, and remember
    /// that the rest already went out unterminated.
    fn discard_partial(&mut self, written: usize, len: usize) {
        self.torn = true;
        tracing::warn!(path = %self.path, written, len, "write timed out mid-line");
        if let Err(e) = termios::tcflush(self.file.as_fd(), FlushArg::TCOFLUSH) {
            tracing::warn!(path = %self.path, error = %e, "failed to flush output queue");
        }
    }

    /// Block until the port accepts more bytes or `timeout` elapses.
    fn wait_writable(&self, timeout: Duration) -> Result<bool, SerialError> {
        let millis = timeout.as_millis().clamp(1, u16::MAX as u128) as u16;
        let mut fds = [PollFd::new(self.file.as_fd(), PollFlags::POLLOUT)];
        match poll(&mut fds, PollTimeout::from(millis)) {
            Ok(ready) => Ok(ready > 0),
            Err(nix::errno::Errno::EINTR) => Ok(true),
            Err(e) => Err(SerialError::Poll(e)),
        }
    }

    /// Device path this port was opened from.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for SerialPort {
    fn drop(&mut self) {
        tracing::info!(path = %self.path, "serial port closed");
    }
}

fn baud_rate(rate: u32) -> Option<BaudRate> {
    let baud = match rate {
        9_600 => BaudRate::B9600,
        19_200 => BaudRate::B19200,
        38_400 => BaudRate::B38400,
        57_600 => BaudRate::B57600,
        115_200 => BaudRate::B115200,
        230_400 => BaudRate::B230400,
        460_800 => BaudRate::B460800,
        921_600 => BaudRate::B921600,
        _ => return None,
    };
    Some(baud)
}
