// src/common/frame.rs

//! Bit-exact encoding of every device-to-host frame.
//!
//! A reading entry packs, most significant bit first:
//!
//! ```text
//! | timestamp (28 bits) | sensor id (2 bits) | value (10 bits) |
//! ```
//!
//! into 40 bits, sent as 5 big-endian bytes. Direct-mode readings are prefixed
//! with the `SendDirectData` tag; buffered entries are sent bare after a
//! flush header. The host-side decoders live here too so both ends share one
//! layout.

use arrayvec::ArrayVec;

use super::{
    command::Opcode,
    error::SimError,
    sensor_id::{SensorId, SENSOR_COUNT},
    types::{SensorReading, VALUE_MAX},
};

// === Field widths ===

pub const VALUE_BITS: u32 = 10;
pub const SENSOR_ID_BITS: u32 = 2;
/// Wide enough for ~74 hours of milliseconds before wrapping on the wire.
pub const TIMESTAMP_BITS: u32 = 28;

pub const SENSOR_ID_MASK: u64 = (1 << SENSOR_ID_BITS) - 1;
pub const TIMESTAMP_MASK: u64 = (1 << TIMESTAMP_BITS) - 1;

/// Bytes in one encoded reading entry.
pub const ENTRY_WIDTH: usize =
    ((TIMESTAMP_BITS + SENSOR_ID_BITS + VALUE_BITS) as usize + 7) / 8;

/// Bytes in a flush header: tag plus 16-bit count.
pub const FLUSH_HEADER_LEN: usize = 3;

/// Longest fixed-size frame the device sends.
pub const MAX_FRAME_LEN: usize = 1 + ENTRY_WIDTH;

// === Status codes ===

pub const SUCCESS: u8 = 0x0;
pub const ERROR: u8 = 0x1;

/// One encoded reading as stored in the buffer.
pub type Entry = [u8; ENTRY_WIDTH];

/// Stack buffer for a fully assembled outbound frame.
pub type FrameBuf = ArrayVec<u8, MAX_FRAME_LEN>;

/// Which event triggered a batch flush.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FlushKind {
    /// Host asked with `GetData`.
    Forced,
    /// Batch timer fired.
    Periodic,
}

impl FlushKind {
    pub const fn tag(self) -> Opcode {
        match self {
            FlushKind::Forced => Opcode::GetData,
            FlushKind::Periodic => Opcode::SendBatchData,
        }
    }
}

/// Packs a reading into a buffer entry.
///
/// Timestamps beyond 28 bits wrap; the host is expected to unwrap them.
pub fn encode_entry(reading: &SensorReading) -> Entry {
    let packed = ((u64::from(reading.timestamp) & TIMESTAMP_MASK) << (SENSOR_ID_BITS + VALUE_BITS))
        | ((u64::from(reading.sensor.get()) & SENSOR_ID_MASK) << VALUE_BITS)
        | u64::from(reading.value & VALUE_MAX);

    let bytes = packed.to_be_bytes();
    let mut entry = [0u8; ENTRY_WIDTH];
    entry.copy_from_slice(&bytes[bytes.len() - ENTRY_WIDTH..]);
    entry
}

/// Frame for a reading sent immediately in direct mode.
pub fn encode_direct(reading: &SensorReading) -> FrameBuf {
    let mut frame = FrameBuf::new();
    frame.push(Opcode::SendDirectData.as_u8());
    frame.extend(encode_entry(reading));
    frame
}

/// `[tag, count_hi, count_lo]`. Counts above `u16::MAX` saturate.
pub fn encode_flush_header(kind: FlushKind, count: usize) -> [u8; FLUSH_HEADER_LEN] {
    let count = u16::try_from(count).unwrap_or(u16::MAX).to_be_bytes();
    [kind.tag().as_u8(), count[0], count[1]]
}

/// `{opcode, SUCCESS}`
pub fn ack(opcode: Opcode) -> FrameBuf {
    status_frame(opcode, SUCCESS)
}

/// `{opcode, ERROR}`
pub fn failure(opcode: Opcode) -> FrameBuf {
    status_frame(opcode, ERROR)
}

fn status_frame(opcode: Opcode, code: u8) -> FrameBuf {
    let mut frame = FrameBuf::new();
    frame.push(opcode.as_u8());
    frame.push(code);
    frame
}

/// `{StopMode, freq(s1), freq(s2), freq(s3), batch rate}`
pub fn encode_frequencies(sensors: [u8; SENSOR_COUNT], batch_rate: u8) -> FrameBuf {
    let mut frame = FrameBuf::new();
    frame.push(Opcode::StopMode.as_u8());
    frame.extend(sensors);
    frame.push(batch_rate);
    frame
}

// --- Host-side decoding ---

/// Unpacks a bare buffer entry (no tag).
pub fn decode_entry(bytes: &[u8]) -> Result<SensorReading, SimError> {
    if bytes.len() < ENTRY_WIDTH {
        return Err(SimError::Truncated { needed: ENTRY_WIDTH, got: bytes.len() });
    }
    let mut wide = [0u8; 8];
    wide[8 - ENTRY_WIDTH..].copy_from_slice(&bytes[..ENTRY_WIDTH]);
    let packed = u64::from_be_bytes(wide);

    let value = (packed & u64::from(VALUE_MAX)) as u16;
    let sensor = SensorId::new(((packed >> VALUE_BITS) & SENSOR_ID_MASK) as u8)?;
    let timestamp = ((packed >> (SENSOR_ID_BITS + VALUE_BITS)) & TIMESTAMP_MASK) as u32;

    Ok(SensorReading { value, sensor, timestamp })
}

/// Unpacks a direct-mode frame, checking its tag.
pub fn decode_direct(bytes: &[u8]) -> Result<SensorReading, SimError> {
    let (&tag, entry) = bytes
        .split_first()
        .ok_or(SimError::Truncated { needed: MAX_FRAME_LEN, got: 0 })?;
    if tag != Opcode::SendDirectData.as_u8() {
        return Err(SimError::UnknownOpcode(tag));
    }
    decode_entry(entry).map_err(|e| match e {
        SimError::Truncated { got, .. } => SimError::Truncated { needed: MAX_FRAME_LEN, got: got + 1 },
        other => other,
    })
}

/// Reads a flush header, returning the flush kind and entry count.
pub fn decode_flush_header(bytes: &[u8]) -> Result<(FlushKind, u16), SimError> {
    if bytes.len() < FLUSH_HEADER_LEN {
        return Err(SimError::Truncated { needed: FLUSH_HEADER_LEN, got: bytes.len() });
    }
    let kind = match bytes[0] {
        b if b == Opcode::GetData.as_u8() => FlushKind::Forced,
        b if b == Opcode::SendBatchData.as_u8() => FlushKind::Periodic,
        other => return Err(SimError::UnknownOpcode(other)),
    };
    Ok((kind, u16::from_be_bytes([bytes[1], bytes[2]])))
}
