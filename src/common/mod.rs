// src/common/mod.rs

// --- Declare all public modules within common ---
pub mod command;
pub mod config;
pub mod error;
pub mod frame;
pub mod hal_traits;
pub mod sensor_id;
pub mod timing;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

// --- Re-export key types/traits/functions for easier access ---

// From command.rs
pub use command::{Command, Opcode};

// From config.rs
pub use config::DeviceConfig;

// From error.rs
pub use error::SimError;

// From frame.rs
pub use frame::{
    decode_direct, decode_entry, decode_flush_header, encode_direct, encode_entry, Entry,
    FlushKind, FrameBuf, ENTRY_WIDTH,
};

// From hal_traits.rs
pub use hal_traits::{DeviceSerial, Scheduler, TimerId};

// From sensor_id.rs
pub use sensor_id::{SensorId, SENSOR_COUNT};

// From types.rs
pub use types::{Mode, ModeReentry, SensorReading, VALUE_MAX};


// --- Feature-gated re-exports ---

#[cfg(feature = "std")]
pub use hal_traits::IoSerial;
