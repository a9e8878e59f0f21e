//! Outbound command channel to the robot controller.

use crate::types::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport not connected")]
    NotConnected,
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("write timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("send task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Sink for actuator commands.
///
/// `send` is a blocking call that must return within a bounded time (the
/// dispatcher runs it on tokio's blocking pool);
/// implementations own their connection and report a closed link as
/// [`TransportError::NotConnected`].
pub trait Transport: Send {
    fn send(&mut self, command: &Command) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, command: &Command) -> Result<(), TransportError> {
        (**self).send(command)
    }
}
