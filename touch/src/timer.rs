//! Software timers driven by a free running hardware tick counter.
//!
//! Each sensor owns a fixed set of timer slots. The firmware programs a single
//! hardware compare alarm for [`TimerQueue::next_wake`], and when it fires the
//! sensor pops every due slot and runs its handler. Handlers never loop or
//! block; they return a [`Disposition`] telling the queue whether to rearm.

/// Hardware timer count. Wraps around, so compare with [`is_before`].
pub type Tick = u32;

/// Longest interval that still orders correctly under [`is_before`]
pub const MAX_INTERVAL: Tick = i32::MAX as Tick;

/// Returns true if `a` is earlier than `b`, tolerating counter wraparound
pub fn is_before(a: Tick, b: Tick) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}

/// Timer slots owned by a touch sensor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerId {
    /// Background baseline sampling
    Baseline,
    /// Probing ticks and the terminator tick of a session
    Session,
}

impl TimerId {
    pub const ALL: [TimerId; 2] = [TimerId::Baseline, TimerId::Session];

    const fn slot(self) -> usize {
        match self {
            TimerId::Baseline => 0,
            TimerId::Session => 1,
        }
    }
}

/// Which handler runs when the session slot fires
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionTimer {
    /// Sample and evaluate once per `rest_ticks`
    Probing,
    /// Release the trigger output after a touch
    Terminator,
}

/// What a timer handler wants done with its slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Fire again at the given tick
    Reschedule(Tick),
    /// Leave the slot disarmed
    Done,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TimerQueue {
    wake: [Option<Tick>; 2],
}

impl TimerQueue {
    pub const fn new() -> Self {
        Self { wake: [None; 2] }
    }

    /// Arm (or move) a slot to fire at `at`
    pub fn arm(&mut self, id: TimerId, at: Tick) {
        critical_section::with(|_| {
            self.wake[id.slot()] = Some(at);
        });
    }

    /// Disarm a slot. Cancelling a disarmed slot does nothing.
    pub fn cancel(&mut self, id: TimerId) {
        critical_section::with(|_| {
            self.wake[id.slot()] = None;
        });
    }

    pub fn waketime(&self, id: TimerId) -> Option<Tick> {
        self.wake[id.slot()]
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.wake[id.slot()].is_some()
    }

    /// Earliest waketime over all armed slots
    pub fn next_wake(&self) -> Option<Tick> {
        self.wake.iter().flatten().copied().fold(None, |earliest, t| match earliest {
            Some(e) if !is_before(t, e) => Some(e),
            _ => Some(t),
        })
    }

    /// Disarm and return the earliest slot due at `now`
    pub fn pop_due(&mut self, now: Tick) -> Option<TimerId> {
        let mut due: Option<(TimerId, Tick)> = None;
        for id in TimerId::ALL {
            if let Some(at) = self.wake[id.slot()] {
                if is_before(now, at) {
                    continue;
                }
                match due {
                    Some((_, earliest)) if !is_before(at, earliest) => (),
                    _ => due = Some((id, at)),
                }
            }
        }

        let (id, _) = due?;
        self.cancel(id);
        Some(id)
    }
}
