// src/lib.rs

#![no_std] // Specify no_std at the crate root

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod common;
pub mod device;
pub mod sensor;

// Re-export key types for convenience
pub use common::{Command, DeviceConfig, Mode, SensorId, SensorReading, SimError};
pub use device::{PeriodicTimers, ProtocolEngine, ReadingBuffer};
pub use sensor::SensorSource;
