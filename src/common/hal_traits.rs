// src/common/hal_traits.rs

use super::sensor_id::SensorId;
use core::fmt::Debug;
use core::time::Duration;

/// Abstraction for the device side of the serial link.
///
/// Bytes are pushed one at a time, the way the firmware writes its UART.
pub trait DeviceSerial {
    /// Associated error type for communication errors.
    type Error: Debug;

    /// Attempts to write a single byte to the serial interface.
    ///
    /// Returns `Ok(())` if the byte was accepted for transmission, or `Err(nb::Error::WouldBlock)`
    /// if the write buffer is full. Other errors are returned as `Err(nb::Error::Other(Self::Error))`.
    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error>;

    /// Attempts to flush the transmit buffer, ensuring all written bytes have been sent.
    fn flush(&mut self) -> nb::Result<(), Self::Error>;
}

/// Periodic callbacks the device relies on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Emission tick of one sensor channel.
    Sensor(SensorId),
    /// Batch-mode flush.
    BatchFlush,
}

/// Abstraction for the event loop that fires periodic callbacks.
///
/// The scheduler only decides *when*; it reports due timers back to the
/// engine (`ProtocolEngine::on_timer`), which does the work.
pub trait Scheduler {
    /// Fire `timer` every `period` from now on. Arming an already armed timer
    /// restarts its schedule.
    fn schedule_every(&mut self, timer: TimerId, period: Duration);

    /// Stop firing `timer`. Cancelling a timer that is not armed does nothing.
    fn cancel(&mut self, timer: TimerId);
}

/// Adapts any `std::io::Write` (a pty, a TCP stream, a `Vec<u8>`) into a
/// device transport.
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct IoSerial<W> {
    inner: W,
}

#[cfg(feature = "std")]
impl<W: std::io::Write> IoSerial<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(feature = "std")]
fn io_to_nb(e: std::io::Error) -> nb::Error<std::io::Error> {
    match e.kind() {
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted => nb::Error::WouldBlock,
        _ => nb::Error::Other(e),
    }
}

#[cfg(feature = "std")]
impl<W: std::io::Write> DeviceSerial for IoSerial<W> {
    type Error = std::io::Error;

    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        match self.inner.write(&[byte]) {
            Ok(1) => Ok(()),
            Ok(_) => Err(nb::Error::WouldBlock),
            Err(e) => Err(io_to_nb(e)),
        }
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        self.inner.flush().map_err(io_to_nb)
    }
}
