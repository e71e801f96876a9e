// src/common/sensor_id.rs

use super::error::SimError;
use core::convert::TryFrom;
use core::fmt;

/// Number of simulated sensor channels on the device.
pub const SENSOR_COUNT: usize = 3;

/// Identifies one of the three sensor channels. Fits in 2 bits on the wire.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct SensorId(u8);

impl SensorId {
    pub const S1: SensorId = SensorId(1);
    pub const S2: SensorId = SensorId(2);
    pub const S3: SensorId = SensorId(3);

    /// All channels in wire order.
    pub const ALL: [SensorId; SENSOR_COUNT] = [Self::S1, Self::S2, Self::S3];

    /// Creates a new `SensorId` if `id` is in 1..=3.
    pub fn new(id: u8) -> Result<Self, SimError> {
        if Self::is_valid(id) {
            Ok(SensorId(id))
        } else {
            Err(SimError::InvalidSensorId(id))
        }
    }

    #[inline]
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Zero-based position, for indexing per-sensor arrays.
    #[inline]
    pub const fn index(&self) -> usize {
        (self.0 - 1) as usize
    }

    #[inline]
    pub const fn is_valid(id: u8) -> bool {
        matches!(id, 1..=3)
    }
}

impl TryFrom<u8> for SensorId {
    type Error = SimError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SensorId> for u8 {
    fn from(value: SensorId) -> Self {
        value.0
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sensor{}", self.0)
    }
}
