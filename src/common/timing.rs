// src/common/timing.rs

use core::time::Duration;

// Periods travel on the wire as one data byte of milliseconds, so anything
// configured by the host lies in MIN_PERIOD..=255 ms.

// === Power-up defaults ===

/// Emission period of sensor 1 at power-up.
pub const SENSOR1_PERIOD: Duration = Duration::from_millis(500);
/// Emission period of sensor 2 at power-up.
pub const SENSOR2_PERIOD: Duration = Duration::from_millis(600);
/// Emission period of sensor 3 at power-up.
pub const SENSOR3_PERIOD: Duration = Duration::from_millis(700);
/// Batch-mode flush interval at power-up.
pub const BATCH_INTERVAL: Duration = Duration::from_millis(30);

/// Non-positive periods are clamped up to this.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

// === Frequencies ===

/// Sensor frequencies are reported in 4 bits.
pub const SENSOR_FREQUENCY_MAX: u8 = 0x0F;

/// Clamps a period to at least `MIN_PERIOD`.
#[inline]
pub fn clamp_period(period: Duration) -> Duration {
    period.max(MIN_PERIOD)
}

/// `round(1 / period_seconds)`, saturating at `u8::MAX`.
pub fn frequency_hz(period: Duration) -> u8 {
    let ms = clamp_period(period).as_millis();
    // Integer round-half-up of 1000 / ms
    let hz = (2000 + ms) / (2 * ms);
    u8::try_from(hz).unwrap_or(u8::MAX)
}

/// Frequency of a sensor channel, saturated to fit its 4-bit wire field.
#[inline]
pub fn sensor_frequency(period: Duration) -> u8 {
    frequency_hz(period).min(SENSOR_FREQUENCY_MAX)
}
