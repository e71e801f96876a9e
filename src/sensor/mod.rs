// src/sensor/mod.rs

// Value generators for the simulated sensor channels.
mod source;

pub use source::SensorSource;
