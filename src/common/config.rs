// src/common/config.rs

use core::time::Duration;

use super::{
    error::SimError,
    sensor_id::{SensorId, SENSOR_COUNT},
    timing,
    types::ModeReentry,
};

/// Power-up configuration of the simulated device.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Emission period per sensor, indexed by `SensorId::index`.
    pub sensor_periods: [Duration; SENSOR_COUNT],
    /// Flush interval used in batch mode.
    pub batch_interval: Duration,
    /// Seed for the value generators. Each sensor derives its own stream.
    pub seed: u64,
    pub mode_reentry: ModeReentry,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sensor_periods: [timing::SENSOR1_PERIOD, timing::SENSOR2_PERIOD, timing::SENSOR3_PERIOD],
            batch_interval: timing::BATCH_INTERVAL,
            seed: 0x5EED,
            mode_reentry: ModeReentry::Accept,
        }
    }
}

impl DeviceConfig {
    pub fn with_sensor_period(mut self, sensor: SensorId, period: Duration) -> Self {
        self.sensor_periods[sensor.index()] = period;
        self
    }

    pub fn with_batch_interval(mut self, interval: Duration) -> Self {
        self.batch_interval = interval;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_mode_reentry(mut self, policy: ModeReentry) -> Self {
        self.mode_reentry = policy;
        self
    }

    /// Checks the configuration strictly.
    ///
    /// The engine itself clamps bad periods instead of failing; call this when a
    /// configuration comes from an operator and mistakes should be reported.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.sensor_periods.iter().any(|p| *p < timing::MIN_PERIOD) {
            return Err(SimError::InvalidConfig("sensor period must be at least 1 ms"));
        }
        if self.batch_interval < timing::MIN_PERIOD {
            return Err(SimError::InvalidConfig("batch interval must be at least 1 ms"));
        }
        Ok(())
    }
}
