// src/common/mock.rs

//! Recording transport and scheduler used by the unit tests.

use core::time::Duration;
use std::vec::Vec;

use super::hal_traits::{DeviceSerial, Scheduler, TimerId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockIoError;

/// Collects written bytes; `flushes` holds the byte offset at each flush so
/// tests can split the output back into frames.
#[derive(Debug, Default)]
pub struct MockSerial {
    pub written: Vec<u8>,
    pub flushes: Vec<usize>,
    pub fail_writes: bool,
    /// Number of `WouldBlock`s returned before each byte is accepted.
    pub stall: u8,
    stalled: u8,
}

impl MockSerial {
    /// Frames written so far, split at flush points.
    pub fn frames(&self) -> Vec<&[u8]> {
        let mut start = 0;
        let mut out = Vec::new();
        for &end in &self.flushes {
            if end > start {
                out.push(&self.written[start..end]);
            }
            start = end;
        }
        out
    }

    pub fn clear(&mut self) {
        self.written.clear();
        self.flushes.clear();
    }
}

impl DeviceSerial for MockSerial {
    type Error = MockIoError;

    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        if self.fail_writes {
            return Err(nb::Error::Other(MockIoError));
        }
        if self.stalled < self.stall {
            self.stalled += 1;
            return Err(nb::Error::WouldBlock);
        }
        self.stalled = 0;
        self.written.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        self.flushes.push(self.written.len());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCall {
    Every(TimerId, Duration),
    Cancel(TimerId),
}

/// Records every call without firing anything.
#[derive(Debug, Default)]
pub struct MockScheduler {
    pub calls: Vec<SchedulerCall>,
}

impl MockScheduler {
    /// Period the timer was last armed with, if it is still armed.
    pub fn armed(&self, timer: TimerId) -> Option<Duration> {
        self.calls.iter().rev().find_map(|call| match *call {
            SchedulerCall::Every(t, p) if t == timer => Some(Some(p)),
            SchedulerCall::Cancel(t) if t == timer => Some(None),
            _ => None,
        })?
    }
}

impl Scheduler for MockScheduler {
    fn schedule_every(&mut self, timer: TimerId, period: Duration) {
        self.calls.push(SchedulerCall::Every(timer, period));
    }

    fn cancel(&mut self, timer: TimerId) {
        self.calls.push(SchedulerCall::Cancel(timer));
    }
}
