// src/sensor/source.rs

use core::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::common::{timing, SensorId, SensorReading, VALUE_MAX};

/// Smallest and largest step of the random walk, inclusive.
const WALK_STEP_MIN: i32 = -30;
const WALK_STEP_MAX: i32 = 29;

/// Simulated sensor channel producing a slowly drifting 10-bit value.
///
/// The source does not own a timer. Whoever schedules it calls [`tick`] once
/// per [`period`], and re-arms its schedule after [`configure`] or [`restart`].
///
/// [`tick`]: SensorSource::tick
/// [`period`]: SensorSource::period
/// [`configure`]: SensorSource::configure
/// [`restart`]: SensorSource::restart
#[derive(Debug, Clone)]
pub struct SensorSource {
    id: SensorId,
    period: Duration,
    value: u16,
    /// Device time since the last restart, in milliseconds.
    elapsed_ms: u32,
    rng: SmallRng,
}

impl SensorSource {
    pub fn new(id: SensorId, period: Duration, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let value = rng.gen_range(0..=VALUE_MAX);
        SensorSource {
            id,
            period: timing::clamp_period(period),
            value,
            elapsed_ms: 0,
            rng,
        }
    }

    #[inline]
    pub fn id(&self) -> SensorId {
        self.id
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Last value produced (or the initial draw before the first tick).
    #[inline]
    pub fn value(&self) -> u16 {
        self.value
    }

    /// Sets the emission period. Periods under 1 ms are clamped.
    pub fn configure(&mut self, period: Duration) {
        self.period = timing::clamp_period(period);
    }

    /// Produces the next reading and advances device time by one period.
    pub fn tick(&mut self) -> SensorReading {
        let step = self.rng.gen_range(WALK_STEP_MIN..=WALK_STEP_MAX);
        let next = (i32::from(self.value) + step).clamp(0, i32::from(VALUE_MAX));
        self.value = next as u16;

        let reading = SensorReading::new(self.value, self.id, self.elapsed_ms);
        self.elapsed_ms = self.elapsed_ms.wrapping_add(self.period_ms());
        reading
    }

    /// Resets device time to zero. The current value is kept.
    pub fn restart(&mut self) {
        self.elapsed_ms = 0;
    }

    /// Emission frequency in Hz as reported to the host (4 bits).
    pub fn frequency(&self) -> u8 {
        timing::sensor_frequency(self.period)
    }

    fn period_ms(&self) -> u32 {
        u32::try_from(self.period.as_millis()).unwrap_or(u32::MAX)
    }
}
