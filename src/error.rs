//! Error types for the rover control core

use crate::rover::task::TaskKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error{
    /// Serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The handshake link never opened; every request fails fast
    #[error("Hardware unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("Timed out after {waited_ms} ms waiting for {expected:?}")]
    AckTimeout{
        expected: crate::uart::Ack,
        waited_ms: u64,
    },

    /// Autonomous worker observed a cancel request at a checkpoint
    #[error("Cancelled")]
    Cancelled,

    #[error("Task already running: {0:?}")]
    TaskAlreadyRunning(TaskKind),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// External stream resource failed to start or stop
    #[error("Resource error: {0}")]
    Resource(String),
}
