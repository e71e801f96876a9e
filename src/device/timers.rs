// src/device/timers.rs

use core::time::Duration;

use heapless::Vec;

use crate::common::{timing, Scheduler, TimerId, SENSOR_COUNT};

/// One timer per sensor plus the batch flush.
pub const MAX_TIMERS: usize = SENSOR_COUNT + 1;

#[derive(Debug, Copy, Clone)]
struct Armed {
    timer: TimerId,
    period: Duration,
    next_due: Duration,
}

/// Virtual-time `Scheduler`.
///
/// Nothing fires on its own: the owner moves time forward with [`poll`] and
/// hands each due timer to the engine. Timers sharing a deadline fire in the
/// order they were first armed.
///
/// [`poll`]: PeriodicTimers::poll
#[derive(Debug, Default)]
pub struct PeriodicTimers {
    armed: Vec<Armed, MAX_TIMERS>,
    now: Duration,
}

impl PeriodicTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    #[inline]
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn period_of(&self, timer: TimerId) -> Option<Duration> {
        self.armed.iter().find(|a| a.timer == timer).map(|a| a.period)
    }

    #[inline]
    pub fn is_armed(&self, timer: TimerId) -> bool {
        self.period_of(timer).is_some()
    }

    /// Earliest pending deadline, if any timer is armed.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.armed.iter().map(|a| a.next_due).min()
    }

    /// Returns the earliest timer due at or before `until` and reschedules it.
    ///
    /// Virtual time moves to that timer's deadline. When nothing is due, time
    /// moves to `until` and `None` is returned. Call repeatedly until `None`.
    pub fn poll(&mut self, until: Duration) -> Option<TimerId> {
        let due = self
            .armed
            .iter()
            .enumerate()
            .filter(|(_, a)| a.next_due <= until)
            .min_by_key(|(i, a)| (a.next_due, *i))
            .map(|(i, _)| i);

        match due {
            Some(i) => {
                let armed = &mut self.armed[i];
                self.now = self.now.max(armed.next_due);
                armed.next_due += armed.period;
                Some(armed.timer)
            }
            None => {
                self.now = self.now.max(until);
                None
            }
        }
    }
}

impl Scheduler for PeriodicTimers {
    fn schedule_every(&mut self, timer: TimerId, period: Duration) {
        let period = timing::clamp_period(period);
        let next_due = self.now + period;
        if let Some(armed) = self.armed.iter_mut().find(|a| a.timer == timer) {
            armed.period = period;
            armed.next_due = next_due;
        } else {
            // Every TimerId fits: there are exactly MAX_TIMERS of them
            let _ = self.armed.push(Armed { timer, period, next_due });
        }
    }

    fn cancel(&mut self, timer: TimerId) {
        self.armed.retain(|a| a.timer != timer);
    }
}
