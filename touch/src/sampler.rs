use crate::rolling::RollingAverage;
use crate::timer::{Tick, TimerId, TimerQueue};
use crate::Error;

/// A rolling average fed from its own periodic timer slot.
///
/// Pausing and resuming only touch the schedule, never the samples, so the
/// average survives any number of pause/resume cycles.
#[derive(Clone, Debug)]
pub struct Sampler<const N: usize> {
    average: RollingAverage<N>,
    timer: TimerId,
    period: Tick,
    running: bool,
}

impl<const N: usize> Sampler<N> {
    pub fn new(timer: TimerId, capacity: usize, period: Tick) -> Result<Self, Error> {
        if period == 0 {
            return Err(Error::ZeroPeriod);
        }
        Ok(Self {
            average: RollingAverage::new(capacity)?,
            timer,
            period,
            running: false,
        })
    }

    pub fn average(&self) -> &RollingAverage<N> {
        &self.average
    }

    pub fn average_mut(&mut self) -> &mut RollingAverage<N> {
        &mut self.average
    }

    pub fn period(&self) -> Tick {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Detach from the scheduler. Safe to call from the sampler's own handler.
    pub fn pause(&mut self, timers: &mut TimerQueue) {
        timers.cancel(self.timer);
        self.running = false;
    }

    /// Attach to the scheduler, first sample one period from `now`
    pub fn resume(&mut self, timers: &mut TimerQueue, now: Tick) {
        timers.arm(self.timer, now.wrapping_add(self.period));
        self.running = true;
    }
}
