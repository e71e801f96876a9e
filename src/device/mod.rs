// src/device/mod.rs

// The simulated weather station: protocol state machine, reading buffer and
// a virtual-time scheduler for driving it without a real event loop.
mod buffer;
mod dispatch;
mod timers;

pub use buffer::{ReadingBuffer, DEFAULT_BUFFER_CAPACITY};
pub use timers::{PeriodicTimers, MAX_TIMERS};

use core::time::Duration;

use log::{debug, info, trace, warn};

use crate::common::{
    frame::{self, FlushKind},
    timing, Command, DeviceConfig, DeviceSerial, Mode, ModeReentry, Scheduler, SensorId, SensorReading,
    SimError, TimerId, SENSOR_COUNT,
};
use crate::sensor::SensorSource;

/// Represents the device end of the link: owns the sensors, the reading buffer
/// and the operating mode.
///
/// All entry points (`on_bytes`, `on_timer`) must be called from a single
/// thread of control. Each returns `None` when nothing was written, or
/// `Some(ok)` with whether the transport accepted the frame.
#[derive(Debug)]
pub struct ProtocolEngine<T, S, const C: usize = DEFAULT_BUFFER_CAPACITY>
where
    T: DeviceSerial,
    S: Scheduler,
{
    serial: T,
    scheduler: S,
    sensors: [SensorSource; SENSOR_COUNT],
    buffer: ReadingBuffer<C>,
    mode: Mode,
    /// Set by the first `StopMode`, which answers with the frequencies frame.
    started: bool,
    batch_interval: Duration,
    mode_reentry: ModeReentry,
}

impl<T, S, const C: usize> ProtocolEngine<T, S, C>
where
    T: DeviceSerial,
    S: Scheduler,
{
    /// Builds the device and arms every sensor timer. Periods under 1 ms are
    /// clamped.
    pub fn new(serial: T, scheduler: S, config: DeviceConfig) -> Self {
        let sensors = SensorId::ALL.map(|id| {
            SensorSource::new(id, config.sensor_periods[id.index()], sensor_seed(config.seed, id))
        });

        let mut engine = ProtocolEngine {
            serial,
            scheduler,
            sensors,
            buffer: ReadingBuffer::new(),
            mode: Mode::NoMode,
            started: false,
            batch_interval: timing::clamp_period(config.batch_interval),
            mode_reentry: config.mode_reentry,
        };
        for id in SensorId::ALL {
            engine.arm_sensor(id);
        }
        info!(
            "device ready: periods {:?}, batch interval {:?}, buffer capacity {}",
            engine.sensors.each_ref().map(|s| s.period()),
            engine.batch_interval,
            C
        );
        engine
    }

    // --- Accessors ---

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether the host has sent its first `StopMode`.
    #[inline]
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn sensor(&self, id: SensorId) -> &SensorSource {
        &self.sensors[id.index()]
    }

    pub fn buffer(&self) -> &ReadingBuffer<C> {
        &self.buffer
    }

    #[inline]
    pub fn batch_interval(&self) -> Duration {
        self.batch_interval
    }

    pub fn serial(&self) -> &T {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut T {
        &mut self.serial
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn into_parts(self) -> (T, S) {
        (self.serial, self.scheduler)
    }

    // --- Inbound events ---

    /// Handles one delivery of bytes from the host.
    ///
    /// Only the command at the head of the chunk is executed; anything after it
    /// is dropped. Empty chunks and unknown opcodes are ignored without reply.
    pub fn on_bytes(&mut self, bytes: &[u8]) -> Option<bool> {
        let command = match Command::parse(bytes) {
            Ok(command) => command,
            Err(SimError::EmptyCommand) => {
                debug!("ignoring empty delivery");
                return None;
            }
            Err(e) => {
                warn!("ignoring command: {}", e);
                return None;
            }
        };
        if bytes.len() > 2 {
            debug!("ignoring {} trailing bytes after command", bytes.len() - 2);
        }
        debug!("received command {}", command);
        self.dispatch(command)
    }

    /// Handles a due periodic timer.
    pub fn on_timer(&mut self, timer: TimerId) -> Option<bool> {
        match timer {
            TimerId::Sensor(id) => {
                let reading = self.sensors[id.index()].tick();
                self.route_reading(reading)
            }
            TimerId::BatchFlush if self.mode == Mode::Batch => Some(self.flush(FlushKind::Periodic)),
            TimerId::BatchFlush => {
                trace!("stale flush tick in {} mode", self.mode);
                None
            }
        }
    }

    /// Sends, buffers or drops a reading according to the current mode.
    pub fn route_reading(&mut self, reading: SensorReading) -> Option<bool> {
        trace!(
            "{} value={} t={}ms in {} mode",
            reading.sensor,
            reading.value,
            reading.timestamp,
            self.mode
        );
        match self.mode {
            Mode::NoMode => None,
            Mode::Direct => Some(self.send_frame(&frame::encode_direct(&reading))),
            Mode::Batch | Mode::OnDemand => {
                if self.buffer.append(frame::encode_entry(&reading)).is_some() {
                    trace!("reading buffer full, dropped oldest entry");
                }
                None
            }
        }
    }

    // --- Outbound helpers ---

    /// Writes the flush header and every buffered entry, then empties the buffer.
    pub(crate) fn flush(&mut self, kind: FlushKind) -> bool {
        let count = self.buffer.entry_count();
        let entries = self.buffer.flush_and_clear();
        debug!("{:?} flush of {} entries", kind, count);

        let header = frame::encode_flush_header(kind, count);
        let result = self.write_all(&header).and_then(|()| {
            for entry in entries.iter() {
                self.write_all(entry)?;
            }
            self.flush_serial()
        });
        self.report(result)
    }

    pub(crate) fn send_frame(&mut self, bytes: &[u8]) -> bool {
        let result = self.write_all(bytes).and_then(|()| self.flush_serial());
        self.report(result)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SimError<T::Error>> {
        for &byte in bytes {
            nb::block!(self.serial.write_byte(byte)).map_err(SimError::Io)?;
        }
        Ok(())
    }

    fn flush_serial(&mut self) -> Result<(), SimError<T::Error>> {
        nb::block!(self.serial.flush()).map_err(SimError::Io)
    }

    fn report(&self, result: Result<(), SimError<T::Error>>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("transport write failed: {}", e);
                false
            }
        }
    }

    fn arm_sensor(&mut self, id: SensorId) {
        let period = self.sensors[id.index()].period();
        self.scheduler.schedule_every(TimerId::Sensor(id), period);
    }
}

impl<T, const C: usize> ProtocolEngine<T, PeriodicTimers, C>
where
    T: DeviceSerial,
{
    /// Moves virtual time to `now`, firing every timer that falls due on the way.
    ///
    /// Returns the number of timer callbacks run.
    pub fn advance_to(&mut self, now: Duration) -> usize {
        let mut fired = 0;
        while let Some(timer) = self.scheduler.poll(now) {
            self.on_timer(timer);
            fired += 1;
        }
        fired
    }
}

/// Gives each sensor its own random stream from one device seed.
fn sensor_seed(seed: u64, id: SensorId) -> u64 {
    seed ^ u64::from(id.get()).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::frame::{decode_direct, decode_entry, decode_flush_header, ENTRY_WIDTH};
    use crate::common::mock::{MockScheduler, MockSerial};

    type TestEngine<const C: usize> = ProtocolEngine<MockSerial, MockScheduler, C>;

    fn engine<const C: usize>() -> TestEngine<C> {
        ProtocolEngine::new(MockSerial::default(), MockScheduler::default(), DeviceConfig::default())
    }

    fn in_mode<const C: usize>(start: u8) -> TestEngine<C> {
        let mut e = engine::<C>();
        e.on_bytes(&[start]);
        e.serial_mut().clear();
        e
    }

    fn reading(value: u16, id: SensorId, timestamp: u32) -> SensorReading {
        SensorReading::new(value, id, timestamp)
    }

    #[test]
    fn test_construction_arms_sensors() {
        let e = engine::<16>();
        assert_eq!(e.mode(), Mode::NoMode);
        assert!(!e.is_started());
        let s = e.scheduler();
        assert_eq!(s.armed(TimerId::Sensor(SensorId::S1)), Some(Duration::from_millis(500)));
        assert_eq!(s.armed(TimerId::Sensor(SensorId::S2)), Some(Duration::from_millis(600)));
        assert_eq!(s.armed(TimerId::Sensor(SensorId::S3)), Some(Duration::from_millis(700)));
        assert_eq!(s.armed(TimerId::BatchFlush), None);
    }

    #[test]
    fn test_no_mode_discards_readings() {
        let mut e = engine::<16>();
        assert_eq!(e.route_reading(reading(100, SensorId::S1, 0)), None);
        assert_eq!(e.on_timer(TimerId::Sensor(SensorId::S2)), None);
        assert!(e.buffer().is_empty());
        assert!(e.serial().written.is_empty());
    }

    #[test]
    fn test_direct_mode_sends_each_reading() {
        let mut e = in_mode::<16>(0x1);
        assert_eq!(e.on_timer(TimerId::Sensor(SensorId::S2)), Some(true));
        assert_eq!(e.on_timer(TimerId::Sensor(SensorId::S2)), Some(true));

        let frames = e.serial().frames();
        assert_eq!(frames.len(), 2);
        let first = decode_direct(frames[0]).unwrap();
        let second = decode_direct(frames[1]).unwrap();
        assert_eq!(first.sensor, SensorId::S2);
        assert_eq!(first.timestamp, 0);
        assert_eq!(second.timestamp, 600);
        assert!(e.buffer().is_empty());
    }

    #[test]
    fn test_buffering_modes_append() {
        for start in [0x2, 0x3] {
            let mut e = in_mode::<16>(start);
            assert_eq!(e.on_timer(TimerId::Sensor(SensorId::S1)), None);
            assert_eq!(e.on_timer(TimerId::Sensor(SensorId::S3)), None);
            assert_eq!(e.buffer().entry_count(), 2);
            assert!(e.serial().written.is_empty());
        }
    }

    #[test]
    fn test_forced_flush_frame() {
        let mut e = in_mode::<16>(0x2);
        let readings = [
            reading(1, SensorId::S1, 0),
            reading(2, SensorId::S2, 0),
            reading(3, SensorId::S1, 500),
        ];
        for r in readings {
            e.route_reading(r);
        }
        assert_eq!(e.on_bytes(&[0x4]), Some(true));

        let out = &e.serial().written;
        assert_eq!(&out[..3], &[0x4, 0x00, 0x03]);
        assert_eq!(out.len(), 3 + 3 * ENTRY_WIDTH);
        for (i, chunk) in out[3..].chunks(ENTRY_WIDTH).enumerate() {
            assert_eq!(decode_entry(chunk).unwrap(), readings[i]);
        }
        assert!(e.buffer().is_empty());
    }

    #[test]
    fn test_get_data_with_empty_buffer() {
        let mut e = engine::<16>();
        assert_eq!(e.on_bytes(&[0x4]), Some(true));
        assert_eq!(e.serial().written, [0x4, 0x00, 0x00]);
    }

    #[test]
    fn test_periodic_flush_only_in_batch() {
        let mut e = in_mode::<16>(0x2);
        e.route_reading(reading(9, SensorId::S3, 0));
        assert_eq!(e.on_timer(TimerId::BatchFlush), Some(true));
        let (kind, count) = decode_flush_header(&e.serial().written).unwrap();
        assert_eq!((kind, count), (FlushKind::Periodic, 1));

        let mut e = in_mode::<16>(0x3);
        e.route_reading(reading(9, SensorId::S3, 0));
        assert_eq!(e.on_timer(TimerId::BatchFlush), None);
        assert!(e.serial().written.is_empty());
        assert_eq!(e.buffer().entry_count(), 1);
    }

    #[test]
    fn test_overflow_keeps_newest() {
        let mut e = in_mode::<2>(0x3);
        for v in 1..=3 {
            e.route_reading(reading(v, SensorId::S1, 0));
        }
        e.on_bytes(&[0x4]);
        let out = &e.serial().written;
        assert_eq!(&out[..3], &[0x4, 0x00, 0x02]);
        assert_eq!(decode_entry(&out[3..]).unwrap().value, 2);
        assert_eq!(decode_entry(&out[3 + ENTRY_WIDTH..]).unwrap().value, 3);
    }

    #[test]
    fn test_write_failure_reported() {
        let mut e = engine::<16>();
        e.serial_mut().fail_writes = true;
        assert_eq!(e.on_bytes(&[0x0]), Some(false));
        // State still changes even though the reply was lost
        assert!(e.is_started());
        assert_eq!(e.on_bytes(&[0x4]), Some(false));
    }

    #[test]
    fn test_would_block_is_retried() {
        let mut e = engine::<16>();
        e.serial_mut().stall = 3;
        assert_eq!(e.on_bytes(&[0x5, 50]), Some(true));
        assert_eq!(e.serial().written, [0x5, 0x0]);
    }

    #[test]
    fn test_ignored_input() {
        let mut e = engine::<16>();
        assert_eq!(e.on_bytes(&[]), None);
        assert_eq!(e.on_bytes(&[0x0C, 1]), None);
        assert_eq!(e.on_bytes(&[0x9]), None);
        assert!(e.serial().written.is_empty());
        assert!(!e.is_started());
    }

    #[test]
    fn test_virtual_time_batch_run() {
        let config = DeviceConfig::default()
            .with_sensor_period(SensorId::S1, Duration::from_millis(10))
            .with_sensor_period(SensorId::S2, Duration::from_millis(20))
            .with_sensor_period(SensorId::S3, Duration::from_millis(40))
            .with_batch_interval(Duration::from_millis(25));
        let mut e: ProtocolEngine<MockSerial, PeriodicTimers, 64> =
            ProtocolEngine::new(MockSerial::default(), PeriodicTimers::new(), config);

        assert_eq!(e.on_bytes(&[0x2]), Some(true));
        // 10 + 5 + 2 sensor ticks and 4 flushes
        assert_eq!(e.advance_to(Duration::from_millis(100)), 21);

        let frames = e.serial().frames();
        assert_eq!(frames[0], &[0x2, 0x0]);
        let counts: std::vec::Vec<u16> = frames[1..]
            .iter()
            .map(|f| {
                let (kind, count) = decode_flush_header(f).unwrap();
                assert_eq!(kind, FlushKind::Periodic);
                assert_eq!(f.len(), 3 + count as usize * ENTRY_WIDTH);
                count
            })
            .collect();
        assert_eq!(counts, [3, 5, 3, 6]);
        assert!(e.buffer().is_empty());
    }

    #[test]
    fn test_manual_polling_and_into_parts() {
        let mut e: ProtocolEngine<MockSerial, PeriodicTimers, 8> =
            ProtocolEngine::new(MockSerial::default(), PeriodicTimers::new(), DeviceConfig::default());
        assert_eq!(e.on_bytes(&[0x1]), Some(true));

        // Host-driven loop instead of advance_to
        let until = Duration::from_millis(1000);
        let mut fired = std::vec::Vec::new();
        while let Some(timer) = e.scheduler_mut().poll(until) {
            assert_eq!(e.on_timer(timer), Some(true));
            fired.push(timer);
        }
        assert_eq!(
            fired,
            [
                TimerId::Sensor(SensorId::S1),
                TimerId::Sensor(SensorId::S2),
                TimerId::Sensor(SensorId::S3),
                TimerId::Sensor(SensorId::S1),
            ]
        );

        let (serial, timers) = e.into_parts();
        assert_eq!(timers.now(), until);
        let frames = serial.frames();
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[0], &[0x1, 0x0]);
        let ids: std::vec::Vec<SensorId> = frames[1..]
            .iter()
            .map(|f| decode_direct(f).unwrap().sensor)
            .collect();
        assert_eq!(ids, [SensorId::S1, SensorId::S2, SensorId::S3, SensorId::S1]);
    }
}
