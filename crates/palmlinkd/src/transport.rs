use palmlink_core::{Command, Transport, TransportError};
use palmlink_hw::{SerialError, SerialPort};

/// Serial link to the controller. Starts disconnected if the port could not be
/// opened, and drops the port after the first I/O failure; sends while
/// disconnected report [`TransportError::NotConnected`].
pub struct SerialTransport {
    port: Option<SerialPort>,
}

impl SerialTransport {
    pub fn new(port: Option<SerialPort>) -> Self {
        Self { port }
    }
}

impl Transport for SerialTransport {
    fn send(&mut self, command: &Command) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;
        let line = command.to_line()?;

        match port.write_line(&line) {
            Ok(()) => Ok(()),
            Err(SerialError::Timeout(after)) => Err(TransportError::Timeout(after)),
            Err(SerialError::Io(err)) => {
                tracing::warn!(path = port.path(), error = %err, "serial link lost");
                self.port = None;
                Err(TransportError::Io(err))
            }
            Err(other) => Err(TransportError::Io(std::io::Error::other(other))),
        }
    }
}
