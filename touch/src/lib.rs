#![cfg_attr(not(test), no_std)]

//! Single channel touch probing on top of a polled ADC.
//!
//! A slow rolling average of the idle sensor level (the baseline) runs in the
//! background. A probing session samples the same channel at a faster rate and
//! reports a touch when the probe average falls far enough below the baseline.

pub mod command;
pub mod dispatch;
pub mod error;
pub mod mcp3462r;
pub mod rolling;
pub mod sampler;
pub mod session;
pub mod timer;

#[cfg(test)]
mod mock;

pub use error::Error;
pub use timer::Tick;

use timer::MAX_INTERVAL;

/// Size of the sample buffer backing every rolling average
pub const BUFFER_SIZE: usize = 15;

/// Operating state of a touch sensor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// No sensor has been bound yet
    Unconfigured,
    /// Background sampling keeps the baseline average fresh
    BaselineSampling,
    /// A probing session owns the ADC
    ProbingSession,
    /// A touch was reported; waiting for the terminator tick to release the trigger
    Cooldown,
}

/// Tuning shared by every touch sensor in the firmware
#[derive(Clone, Copy, Debug)]
pub struct TouchConfig {
    /// Frequency of the scheduler tick counter in Hz
    pub tick_freq: u32,
    /// Ticks between the end of a detecting session and the terminator tick
    pub settle_ticks: Tick,
    /// Number of samples averaged by both the baseline and probe estimators.
    /// Must be in `1..=BUFFER_SIZE`.
    pub capacity: usize,
    /// Emit a report frame for every ADC read
    pub report_reads: bool,
}

impl TouchConfig {
    pub const fn default() -> Self {
        Self {
            tick_freq: 1_000_000,
            settle_ticks: 500_000,
            capacity: BUFFER_SIZE,
            report_reads: true,
        }
    }

    /// Convert a duration in microseconds to scheduler ticks.
    ///
    /// Fails if the result rounds to zero or is too long to schedule.
    pub fn ticks_from_us(&self, us: u32) -> Result<Tick, Error> {
        match us as u64 * self.tick_freq as u64 / 1_000_000 {
            0 => Err(Error::ZeroPeriod),
            ticks if ticks > MAX_INTERVAL as u64 => Err(Error::IntervalTooLong),
            ticks => Ok(ticks as Tick),
        }
    }
}

pub const DEFAULT_TOUCH_CONFIG: TouchConfig = TouchConfig::default();

#[cfg(test)]
pub mod test {
    use super::*;

    #[test]
    fn test_ticks_from_us() {
        let config = DEFAULT_TOUCH_CONFIG;
        assert_eq!(config.ticks_from_us(50_000), Ok(50_000));

        let config = TouchConfig { tick_freq: 48_000_000, ..DEFAULT_TOUCH_CONFIG };
        assert_eq!(config.ticks_from_us(1), Ok(48));
        assert_eq!(config.ticks_from_us(100_000), Ok(4_800_000));

        let config = TouchConfig { tick_freq: 1_000, ..DEFAULT_TOUCH_CONFIG };
        assert_eq!(config.ticks_from_us(999), Err(Error::ZeroPeriod));
    }

    #[test]
    fn test_ticks_from_us_out_of_range() {
        let config = TouchConfig { tick_freq: 48_000_000, ..DEFAULT_TOUCH_CONFIG };
        // 44 s is the longest whole second period a 48 MHz counter can order
        assert_eq!(config.ticks_from_us(44_000_000), Ok(2_112_000_000));
        assert_eq!(config.ticks_from_us(45_000_000), Err(Error::IntervalTooLong));
        assert_eq!(config.ticks_from_us(u32::MAX), Err(Error::IntervalTooLong));

        // Never wraps to a short period
        let config = TouchConfig { tick_freq: u32::MAX, ..DEFAULT_TOUCH_CONFIG };
        assert_eq!(config.ticks_from_us(1_000_000), Err(Error::IntervalTooLong));
    }
}
