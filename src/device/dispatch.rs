// src/device/dispatch.rs

use super::ProtocolEngine; // Access ProtocolEngine definition
use crate::common::{
    frame::{self, FlushKind, FrameBuf},
    timing, Command, DeviceSerial, Mode, ModeReentry, Opcode, Scheduler, SensorId, TimerId,
};
use core::time::Duration;
use log::{info, warn};

// Implementation block for command handling and mode transitions
impl<T, S, const C: usize> ProtocolEngine<T, S, C>
where
    T: DeviceSerial,
    S: Scheduler,
{
    /// Executes a parsed host command and sends its reply.
    pub(super) fn dispatch(&mut self, command: Command) -> Option<bool> {
        match command {
            Command::StopMode if !self.started => {
                // The host's first StopMode is its handshake: report rates, stay idle
                self.started = true;
                info!("host connected");
                let reply = self.frequencies_frame();
                Some(self.send_frame(&reply))
            }
            Command::StopMode => self.set_mode(Mode::NoMode, Opcode::StopMode),
            Command::StartMode1 => self.set_mode(Mode::Direct, Opcode::StartMode1),
            Command::StartMode2 => self.set_mode(Mode::Batch, Opcode::StartMode2),
            Command::StartMode3 => self.set_mode(Mode::OnDemand, Opcode::StartMode3),
            Command::GetData => Some(self.flush(FlushKind::Forced)),
            Command::ConfigureSensor { sensor, period_ms } => {
                self.configure_sensor(sensor, Duration::from_millis(u64::from(period_ms)));
                Some(self.send_frame(&frame::ack(command.opcode())))
            }
            Command::ConfigureBatchRate { interval_ms } => {
                self.configure_batch_rate(Duration::from_millis(u64::from(interval_ms)));
                Some(self.send_frame(&frame::ack(command.opcode())))
            }
            Command::GetFrequencies => {
                let reply = self.frequencies_frame();
                Some(self.send_frame(&reply))
            }
        }
    }

    /// Switches to `mode`, re-arming timers, and acknowledges with `opcode`.
    fn set_mode(&mut self, mode: Mode, opcode: Opcode) -> Option<bool> {
        let previous = self.mode;
        if self.mode_reentry == ModeReentry::Reject && mode != Mode::NoMode && previous != Mode::NoMode {
            warn!("refusing {} mode while {} mode is running", mode, previous);
            return Some(self.send_frame(&frame::failure(opcode)));
        }

        self.mode = mode;
        if previous == Mode::Batch && mode != Mode::Batch {
            self.scheduler.cancel(TimerId::BatchFlush);
        }
        if mode == Mode::Batch {
            self.scheduler.schedule_every(TimerId::BatchFlush, self.batch_interval);
        }
        if mode != Mode::NoMode {
            self.restart_sensors();
        }
        info!("mode {} -> {}", previous, mode);

        Some(self.send_frame(&frame::ack(opcode)))
    }

    fn configure_sensor(&mut self, id: SensorId, period: Duration) {
        self.sensors[id.index()].configure(period);
        self.arm_sensor(id);
        info!("{} period set to {:?}", id, self.sensors[id.index()].period());
    }

    fn configure_batch_rate(&mut self, interval: Duration) {
        self.batch_interval = timing::clamp_period(interval);
        if self.mode == Mode::Batch {
            self.scheduler.schedule_every(TimerId::BatchFlush, self.batch_interval);
        }
        info!("batch interval set to {:?}", self.batch_interval);
    }

    /// Zeroes every sensor's device time and restarts its schedule.
    fn restart_sensors(&mut self) {
        for id in SensorId::ALL {
            self.sensors[id.index()].restart();
            self.arm_sensor(id);
        }
    }

    fn frequencies_frame(&self) -> FrameBuf {
        let sensors = self.sensors.each_ref().map(|s| s.frequency());
        frame::encode_frequencies(sensors, timing::frequency_hz(self.batch_interval))
    }
}
