// src/common/types.rs

use core::fmt;

use super::sensor_id::SensorId;

/// Largest value a reading can carry (10 bits).
pub const VALUE_MAX: u16 = 0x3FF;

/// A single sample produced by a sensor channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SensorReading {
    /// Sample value, always within `0..=VALUE_MAX`.
    pub value: u16,
    pub sensor: SensorId,
    /// Milliseconds of device time since the sensor was last restarted.
    pub timestamp: u32,
}

impl SensorReading {
    /// Creates a reading, masking `value` down to 10 bits.
    pub fn new(value: u16, sensor: SensorId, timestamp: u32) -> Self {
        Self {
            value: value & VALUE_MAX,
            sensor,
            timestamp,
        }
    }
}

/// Operating mode of the device. Exactly one is active at a time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// Readings are discarded.
    #[default]
    NoMode,
    /// Every reading is sent as soon as it is produced.
    Direct,
    /// Readings are buffered and flushed on the batch timer.
    Batch,
    /// Readings are buffered until the host asks for them.
    OnDemand,
}

impl Mode {
    /// Whether readings are appended to the buffer in this mode.
    #[inline]
    pub const fn buffers_readings(self) -> bool {
        matches!(self, Mode::Batch | Mode::OnDemand)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::NoMode => "no mode",
            Mode::Direct => "direct",
            Mode::Batch => "batch",
            Mode::OnDemand => "on-demand",
        };
        f.write_str(name)
    }
}

/// What to do when the host starts a mode while a mode is already running.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ModeReentry {
    /// Always switch and acknowledge, re-arming timers.
    #[default]
    Accept,
    /// Answer with a failure frame if the requested mode is already active, or if
    /// another mode is running and has not been stopped first.
    ///
    /// Both refusals use the single `ERROR` status (`[opcode, 0x1]`); there are
    /// no separate "already started" and "other mode running" codes. `StopMode`
    /// is never refused, even when no mode is running.
    Reject,
}
