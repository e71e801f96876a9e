// src/device/buffer.rs

use heapless::Deque;

use crate::common::frame::{Entry, ENTRY_WIDTH};

/// Default number of entries the device can hold between flushes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Bounded FIFO of encoded reading entries awaiting a flush.
///
/// When full, appending evicts the oldest entry. `C` must not exceed
/// `u16::MAX`: a flush header counts at most that many entries, so a larger
/// buffer is rejected at compile time.
#[derive(Debug)]
pub struct ReadingBuffer<const C: usize = DEFAULT_BUFFER_CAPACITY> {
    entries: Deque<Entry, C>,
    evicted: u32,
}

impl<const C: usize> Default for ReadingBuffer<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const C: usize> ReadingBuffer<C> {
    /// Largest capacity whose full flush still fits the 16-bit header count.
    pub const MAX_CAPACITY: usize = u16::MAX as usize;

    const CAPACITY_FITS_HEADER: () = assert!(
        C <= Self::MAX_CAPACITY,
        "reading buffer capacity exceeds the 16-bit flush count"
    );

    pub const fn new() -> Self {
        let () = Self::CAPACITY_FITS_HEADER;
        ReadingBuffer {
            entries: Deque::new(),
            evicted: 0,
        }
    }

    /// Appends an entry, dropping the oldest one first if the buffer is full.
    ///
    /// Returns the evicted entry, if any.
    pub fn append(&mut self, entry: Entry) -> Option<Entry> {
        let dropped = if self.entries.is_full() {
            self.evicted = self.evicted.wrapping_add(1);
            self.entries.pop_front()
        } else {
            None
        };
        // Cannot fail, a slot was freed above when full
        let _ = self.entries.push_back(entry);
        dropped
    }

    /// Takes every buffered entry in arrival order, leaving the buffer empty.
    pub fn flush_and_clear(&mut self) -> Deque<Entry, C> {
        core::mem::replace(&mut self.entries, Deque::new())
    }

    /// Number of buffered bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.entries.len() * ENTRY_WIDTH
    }

    /// Number of buffered entries, derived from the byte length.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.byte_len() / ENTRY_WIDTH
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        C
    }

    /// Entries dropped to overflow since construction.
    #[inline]
    pub fn evicted(&self) -> u32 {
        self.evicted
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Like [`flush_and_clear`](Self::flush_and_clear), but as one contiguous
    /// byte vector ready to hand to a host-side decoder.
    #[cfg(feature = "alloc")]
    pub fn flush_to_vec(&mut self) -> alloc::vec::Vec<u8> {
        let mut bytes = alloc::vec::Vec::with_capacity(self.byte_len());
        for entry in self.flush_and_clear().iter() {
            bytes.extend_from_slice(entry);
        }
        bytes
    }
}
