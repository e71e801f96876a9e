// src/common/error.rs

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError<E = ()>
where
    E: core::fmt::Debug, // Debug is all the Io variant's message needs
{
    /// Underlying I/O error from the transport implementation.
    #[error("I/O error: {0:?}")]
    Io(E),

    /// An inbound delivery carried no bytes at all.
    #[error("Empty command")]
    EmptyCommand,

    /// First byte of a delivery is not a host opcode.
    #[error("Unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    /// Sensor identifiers are 1..=3.
    #[error("Invalid sensor id: {0}")]
    InvalidSensorId(u8),

    /// Not enough bytes to decode a frame.
    #[error("Truncated frame: needed {needed}, got {got}")]
    Truncated { needed: usize, got: usize },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
