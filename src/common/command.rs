// src/common/command.rs

//! Host command set and opcode table.
//!
//! A host command is one or two bytes: `[opcode]` or `[opcode, data]`. Opcodes
//! `0x9` and `0xA` never come from the host; they only tag outbound reading frames.

use core::convert::TryFrom;
use core::fmt;

use super::{error::SimError, sensor_id::SensorId};

/// Every opcode byte known to the protocol, inbound and outbound.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Stop the running mode. The first one after power-up answers with the
    /// frequencies frame instead.
    StopMode = 0x0,
    StartMode1 = 0x1,
    StartMode2 = 0x2,
    StartMode3 = 0x3,
    GetData = 0x4,
    ConfigureSensor1 = 0x5,
    ConfigureSensor2 = 0x6,
    ConfigureSensor3 = 0x7,
    ConfigureBatchRate = 0x8,
    /// Outbound only: tags a reading sent straight away in direct mode.
    SendDirectData = 0x9,
    /// Outbound only: tags a periodic batch flush.
    SendBatchData = 0xA,
    GetFrequencies = 0xB,
}

impl Opcode {
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether a host is allowed to send this opcode.
    pub const fn is_host_command(self) -> bool {
        !matches!(self, Opcode::SendDirectData | Opcode::SendBatchData)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = SimError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x0 => Opcode::StopMode,
            0x1 => Opcode::StartMode1,
            0x2 => Opcode::StartMode2,
            0x3 => Opcode::StartMode3,
            0x4 => Opcode::GetData,
            0x5 => Opcode::ConfigureSensor1,
            0x6 => Opcode::ConfigureSensor2,
            0x7 => Opcode::ConfigureSensor3,
            0x8 => Opcode::ConfigureBatchRate,
            0x9 => Opcode::SendDirectData,
            0xA => Opcode::SendBatchData,
            0xB => Opcode::GetFrequencies,
            other => return Err(SimError::UnknownOpcode(other)),
        })
    }
}

impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self {
        value as u8
    }
}

/// A decoded host command.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    StopMode,
    StartMode1,
    StartMode2,
    StartMode3,
    GetData,
    /// Set the emission period of a sensor, in milliseconds.
    ConfigureSensor { sensor: SensorId, period_ms: u8 },
    /// Set the batch flush interval, in milliseconds.
    ConfigureBatchRate { interval_ms: u8 },
    GetFrequencies,
}

impl Command {
    /// Parses the command at the head of an inbound chunk.
    ///
    /// Only the first command is read; bytes after `[opcode, data]` are left for
    /// the caller to ignore. A single-byte chunk carries `data = 0`.
    pub fn parse(bytes: &[u8]) -> Result<Self, SimError> {
        let (&first, rest) = bytes.split_first().ok_or(SimError::EmptyCommand)?;
        let data = rest.first().copied().unwrap_or(0);

        let opcode = Opcode::try_from(first)?;
        Ok(match opcode {
            Opcode::StopMode => Command::StopMode,
            Opcode::StartMode1 => Command::StartMode1,
            Opcode::StartMode2 => Command::StartMode2,
            Opcode::StartMode3 => Command::StartMode3,
            Opcode::GetData => Command::GetData,
            Opcode::ConfigureSensor1 => Command::ConfigureSensor { sensor: SensorId::S1, period_ms: data },
            Opcode::ConfigureSensor2 => Command::ConfigureSensor { sensor: SensorId::S2, period_ms: data },
            Opcode::ConfigureSensor3 => Command::ConfigureSensor { sensor: SensorId::S3, period_ms: data },
            Opcode::ConfigureBatchRate => Command::ConfigureBatchRate { interval_ms: data },
            Opcode::GetFrequencies => Command::GetFrequencies,
            // Reading tags are device-to-host only
            Opcode::SendDirectData | Opcode::SendBatchData => {
                return Err(SimError::UnknownOpcode(first))
            }
        })
    }

    /// The opcode this command was sent with, echoed back in acknowledgements.
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::StopMode => Opcode::StopMode,
            Command::StartMode1 => Opcode::StartMode1,
            Command::StartMode2 => Opcode::StartMode2,
            Command::StartMode3 => Opcode::StartMode3,
            Command::GetData => Opcode::GetData,
            Command::ConfigureSensor { sensor, .. } => match sensor.get() {
                1 => Opcode::ConfigureSensor1,
                2 => Opcode::ConfigureSensor2,
                _ => Opcode::ConfigureSensor3,
            },
            Command::ConfigureBatchRate { .. } => Opcode::ConfigureBatchRate,
            Command::GetFrequencies => Opcode::GetFrequencies,
        }
    }

    /// Data byte carried by the command (0 when the opcode takes none).
    pub fn data(&self) -> u8 {
        match self {
            Command::ConfigureSensor { period_ms, .. } => *period_ms,
            Command::ConfigureBatchRate { interval_ms } => *interval_ms,
            _ => 0,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:#04x}) data={}", self.opcode(), self.opcode().as_u8(), self.data())
    }
}
