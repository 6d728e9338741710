use embedded_hal::digital::OutputPin;
use log::{debug, info, trace, warn};

use crate::command::{Report, Reporter};
use crate::mcp3462r::Transport;
use crate::rolling::RollingAverage;
use crate::sampler::Sampler;
use crate::timer::{Disposition, SessionTimer, Tick, TimerId, TimerQueue, MAX_INTERVAL};
use crate::{DeviceState, Error, TouchConfig, BUFFER_SIZE};

/// Peripherals bound to a sensor at configuration time
pub struct Hardware<T, TRIG, EN> {
    pub transport: T,
    /// Raised on touch, released by the terminator tick
    pub trigger: TRIG,
    /// Powers the probe for the duration of a session
    pub enable: EN,
}

/// Result of a resume request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resumed {
    Started,
    AlreadyRunning,
}

/// Returns true if `reading` has dropped more than `sensitivity` below `baseline`.
///
/// A reading at or above the baseline is never a touch.
pub fn is_touch(baseline: f32, reading: f32, sensitivity: u16) -> bool {
    baseline > reading && baseline - reading > sensitivity as f32
}

/// Touch session controller for one sensor channel.
///
/// Outside a session the baseline sampler owns the ADC. A session hands the
/// ADC to the probe estimator, which starts from a copy of the baseline
/// window and is fed every `rest_ticks` until a reading falls far enough below
/// the baseline or the cycle budget runs out.
pub struct TouchSensor<T, TRIG, EN, const N: usize = BUFFER_SIZE> {
    oid: u8,
    config: TouchConfig,
    transport: T,
    trigger: TRIG,
    enable: EN,
    /// Cleared by `reset_adc`; no conversions are read until `init_adc`
    adc_initialized: bool,
    state: DeviceState,
    baseline: Sampler<N>,
    probe: RollingAverage<N>,
    timers: TimerQueue,
    session_timer: SessionTimer,
    sensitivity: u16,
    remaining_cycles: u32,
    rest_ticks: Tick,
    detected: bool,
    last_raw: u16,
    last_probe_average: f32,
    last_baseline_average: f32,
}

impl<T, TRIG, EN, const N: usize> TouchSensor<T, TRIG, EN, N>
where
    T: Transport,
    TRIG: OutputPin,
    EN: OutputPin,
{
    /// Bind the hardware and start baseline sampling every `baseline_period_us`
    pub fn configure(
        oid: u8,
        hardware: Hardware<T, TRIG, EN>,
        baseline_period_us: u32,
        config: &TouchConfig,
        now: Tick,
    ) -> Result<Self, Error> {
        let period = config.ticks_from_us(baseline_period_us)?;
        let baseline = Sampler::new(TimerId::Baseline, config.capacity, period)?;
        let probe = RollingAverage::new(config.capacity)?;

        let Hardware { transport, mut trigger, mut enable } = hardware;
        trigger.set_low().map_err(|_| Error::Pin)?;
        enable.set_low().map_err(|_| Error::Pin)?;

        let mut sensor = Self {
            oid,
            config: *config,
            transport,
            trigger,
            enable,
            adc_initialized: true,
            state: DeviceState::BaselineSampling,
            baseline,
            probe,
            timers: TimerQueue::new(),
            session_timer: SessionTimer::Probing,
            sensitivity: 0,
            remaining_cycles: 0,
            rest_ticks: 0,
            detected: false,
            last_raw: 0,
            last_probe_average: 0.0,
            last_baseline_average: 0.0,
        };
        sensor.baseline.resume(&mut sensor.timers, now);

        info!(
            "Touch sensor ADC configured with OID={} cycle_us={} period={} ticks",
            oid, baseline_period_us, period
        );
        Ok(sensor)
    }

    /// Begin a probing session, first probing tick at `now + rest_ticks`
    pub fn start_session(
        &mut self,
        now: Tick,
        timeout_cycles: u32,
        rest_ticks: Tick,
        sensitivity: u16,
    ) -> Result<(), Error> {
        match self.state {
            DeviceState::ProbingSession | DeviceState::Cooldown => return Err(Error::SessionActive),
            DeviceState::Unconfigured => return Err(Error::NotConfigured),
            DeviceState::BaselineSampling => (),
        }
        if !self.adc_initialized {
            return Err(Error::AdcNotInitialized);
        }
        if timeout_cycles == 0 {
            return Err(Error::ZeroTimeout);
        }
        if rest_ticks == 0 {
            return Err(Error::ZeroRestTicks);
        }
        if rest_ticks > MAX_INTERVAL {
            return Err(Error::IntervalTooLong);
        }
        if sensitivity == 0 {
            return Err(Error::ZeroSensitivity);
        }

        self.enable.set_high().map_err(|_| Error::Pin)?;

        self.remaining_cycles = timeout_cycles;
        self.rest_ticks = rest_ticks;
        self.sensitivity = sensitivity;
        self.detected = false;

        self.probe.reset();
        self.last_probe_average = self.probe.push_many(self.baseline.average().history());
        self.last_baseline_average = self.baseline.average().last_average();

        self.state = DeviceState::ProbingSession;
        self.session_timer = SessionTimer::Probing;
        self.timers.arm(TimerId::Session, now.wrapping_add(rest_ticks));

        info!(
            "Starting touch sensing session with OID={}, timeout_cycles={}, rest_ticks={}, sensitivity={}, baseline={}",
            self.oid, timeout_cycles, rest_ticks, sensitivity, self.last_baseline_average
        );
        Ok(())
    }

    /// Rearm background sampling if it is not already running
    pub fn resume_baseline(&mut self, now: Tick) -> Resumed {
        if self.baseline.is_running() {
            info!("Rolling average is already running for OID={}", self.oid);
            return Resumed::AlreadyRunning;
        }
        info!("Resuming rolling average for OID={}", self.oid);
        self.baseline.resume(&mut self.timers, now);
        Resumed::Started
    }

    /// Full ADC reset. Sampling is suspended until `init_adc`.
    pub fn reset_adc(&mut self) -> Result<(), Error> {
        if self.session_active() {
            return Err(Error::SessionActive);
        }
        self.transport.reset().map_err(|e| {
            warn!("ADC reset failed: {:?}", e);
            Error::Transport
        })?;
        self.adc_initialized = false;
        info!("Touch sensor reset for OID={}, reinitialize once attachment is connected", self.oid);
        Ok(())
    }

    /// Reload the ADC setup after `reset_adc`. No-op if already initialized.
    pub fn init_adc(&mut self) -> Result<(), Error> {
        if self.adc_initialized {
            info!("Touch sensor ADC already initialized for OID={}, reset first", self.oid);
            return Ok(());
        }
        self.transport.init().map_err(|e| {
            warn!("ADC init failed: {:?}", e);
            Error::Transport
        })?;
        self.adc_initialized = true;
        info!("Touch sensor ADC initialized for OID={}", self.oid);
        Ok(())
    }

    /// One-shot read of the latest conversion. Leaves both averages alone.
    pub fn read_value(&mut self) -> Result<u16, Error> {
        if !self.adc_initialized {
            return Err(Error::AdcNotInitialized);
        }
        self.transport.read_raw().map_err(|e| {
            warn!("ADC read failed: {:?}", e);
            Error::Transport
        })
    }

    fn session_active(&self) -> bool {
        matches!(self.state, DeviceState::ProbingSession | DeviceState::Cooldown)
    }

    /// Run every timer due at `now`.
    ///
    /// Returns the tick the hardware alarm should be set to next, if any.
    pub fn run_timers<R: Reporter>(&mut self, now: Tick, reporter: &mut R) -> Option<Tick> {
        while let Some(id) = self.timers.pop_due(now) {
            let disposition = match id {
                TimerId::Baseline => self.baseline_tick(now, reporter),
                TimerId::Session => match self.session_timer {
                    SessionTimer::Probing => self.probe_tick(now, reporter),
                    SessionTimer::Terminator => self.terminator_tick(now),
                },
            };
            if let Disposition::Reschedule(at) = disposition {
                self.timers.arm(id, at);
            }
        }
        self.timers.next_wake()
    }

    fn baseline_tick<R: Reporter>(&mut self, now: Tick, reporter: &mut R) -> Disposition {
        if self.state != DeviceState::BaselineSampling {
            debug!("Session is active, pausing periodic read");
            self.baseline.pause(&mut self.timers);
            return Disposition::Done;
        }

        match self.sample() {
            Some(raw) => {
                let avg = self.baseline.average_mut().push(raw as f32);
                self.last_baseline_average = avg;
                trace!("Periodic read: raw ADC data: {}, rolling avg is: {}", raw, avg);
                if self.config.report_reads {
                    reporter.report(Report::PeriodicRead { oid: self.oid, raw, avg: avg as u16 });
                }
            }
            None => trace!("Periodic read: ADC not ready"),
        }

        Disposition::Reschedule(now.wrapping_add(self.baseline.period()))
    }

    fn probe_tick<R: Reporter>(&mut self, now: Tick, reporter: &mut R) -> Disposition {
        if self.state != DeviceState::ProbingSession {
            return Disposition::Done;
        }

        if let Some(raw) = self.sample() {
            let probe = self.probe.push(raw as f32);
            let baseline = self.baseline.average().last_average();
            self.last_probe_average = probe;
            self.last_baseline_average = baseline;

            if self.config.report_reads {
                reporter.report(Report::ProbingRead { oid: self.oid, raw, avg: baseline as u16 });
            }

            if is_touch(baseline, raw as f32, self.sensitivity) {
                if !self.detected {
                    info!(
                        "Touch detected: raw data={}, probe avg={}, baseline={}, sensitivity={}, cycle={}",
                        raw, probe, baseline, self.sensitivity, self.remaining_cycles
                    );
                    drive(&mut self.trigger, true, "trigger");
                    self.detected = true;
                    // One tick left: the session ends and reports on the next one
                    self.remaining_cycles = 1;
                    return Disposition::Reschedule(now.wrapping_add(self.rest_ticks));
                }
            } else if !self.detected {
                drive(&mut self.trigger, false, "trigger");
            }
        }

        self.remaining_cycles = self.remaining_cycles.saturating_sub(1);
        if self.remaining_cycles > 0 {
            return Disposition::Reschedule(now.wrapping_add(self.rest_ticks));
        }

        drive(&mut self.enable, false, "enable");
        reporter.report(Report::SessionResult {
            oid: self.oid,
            detected: self.detected,
            last_value: self.last_raw,
        });

        if self.detected {
            info!("Session ended with touch, releasing trigger in {} ticks", self.config.settle_ticks);
            self.state = DeviceState::Cooldown;
            self.session_timer = SessionTimer::Terminator;
            Disposition::Reschedule(now.wrapping_add(self.config.settle_ticks))
        } else {
            info!("Session timed out without sensing");
            self.state = DeviceState::BaselineSampling;
            self.resume_baseline(now);
            Disposition::Done
        }
    }

    fn terminator_tick(&mut self, now: Tick) -> Disposition {
        drive(&mut self.trigger, false, "trigger");
        self.session_timer = SessionTimer::Probing;
        self.state = DeviceState::BaselineSampling;
        debug!("Terminator event triggered for OID={}", self.oid);
        self.resume_baseline(now);
        Disposition::Done
    }

    /// Take one reading if the ADC has one. Bus faults are logged and skipped.
    fn sample(&mut self) -> Option<u16> {
        if !self.adc_initialized {
            return None;
        }
        match self.transport.is_ready() {
            Ok(true) => (),
            Ok(false) => return None,
            Err(e) => {
                warn!("ADC ready check failed: {:?}", e);
                return None;
            }
        }
        match self.transport.read_raw() {
            Ok(raw) => {
                self.last_raw = raw;
                Some(raw)
            }
            Err(e) => {
                warn!("ADC read failed: {:?}", e);
                None
            }
        }
    }

    pub fn oid(&self) -> u8 {
        self.oid
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn adc_initialized(&self) -> bool {
        self.adc_initialized
    }

    pub fn sensitivity(&self) -> u16 {
        self.sensitivity
    }

    pub fn remaining_cycles(&self) -> u32 {
        self.remaining_cycles
    }

    pub fn rest_ticks(&self) -> Tick {
        self.rest_ticks
    }

    /// Outcome of the running or most recent session
    pub fn detected(&self) -> bool {
        self.detected
    }

    pub fn baseline(&self) -> &RollingAverage<N> {
        self.baseline.average()
    }

    pub fn probe(&self) -> &RollingAverage<N> {
        &self.probe
    }

    pub fn is_baseline_running(&self) -> bool {
        self.baseline.is_running()
    }

    pub fn session_timer(&self) -> SessionTimer {
        self.session_timer
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn next_wake(&self) -> Option<Tick> {
        self.timers.next_wake()
    }

    pub fn last_raw(&self) -> u16 {
        self.last_raw
    }

    pub fn last_probe_average(&self) -> f32 {
        self.last_probe_average
    }

    pub fn last_baseline_average(&self) -> f32 {
        self.last_baseline_average
    }
}

fn drive<P: OutputPin>(pin: &mut P, high: bool, name: &str) {
    let result = if high { pin.set_high() } else { pin.set_low() };
    if let Err(e) = result {
        warn!("{} pin write failed: {:?}", name, e);
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::mock::{Frames, MockAdc, MockPin};
    use crate::DEFAULT_TOUCH_CONFIG;

    const PERIOD_US: u32 = 50_000;
    const REST: Tick = 1_000;

    type Sensor = TouchSensor<MockAdc, MockPin, MockPin>;

    struct Rig {
        sensor: Sensor,
        adc: MockAdc,
        trigger: MockPin,
        enable: MockPin,
        frames: Frames,
        now: Tick,
    }

    impl Rig {
        fn new() -> Self {
            Self::with_config(&DEFAULT_TOUCH_CONFIG)
        }

        fn with_config(config: &TouchConfig) -> Self {
            let adc = MockAdc::new();
            let trigger = MockPin::new(true);
            let enable = MockPin::new(true);
            let hardware = Hardware {
                transport: adc.clone(),
                trigger: trigger.clone(),
                enable: enable.clone(),
            };
            let sensor = TouchSensor::configure(1, hardware, PERIOD_US, config, 0).unwrap();
            Self { sensor, adc, trigger, enable, frames: Frames::default(), now: 0 }
        }

        /// Advance to the next armed timer and run it
        fn step(&mut self) {
            self.now = self.sensor.next_wake().expect("no timer armed");
            self.sensor.run_timers(self.now, &mut self.frames);
        }

        /// Feed `value` through `n` baseline ticks
        fn baseline(&mut self, value: u16, n: usize) {
            self.adc.set(Some(value));
            for _ in 0..n {
                assert_eq!(self.sensor.next_wake(), self.sensor.timers().waketime(TimerId::Baseline));
                self.step();
            }
        }

        fn start(&mut self, timeout_cycles: u32, sensitivity: u16) {
            self.sensor.start_session(self.now, timeout_cycles, REST, sensitivity).unwrap();
        }

        /// Run one probing tick reading `value`
        fn probe(&mut self, value: Option<u16>) {
            self.adc.set(value);
            self.now = self.sensor.timers().waketime(TimerId::Session).expect("session not armed");
            self.sensor.run_timers(self.now, &mut self.frames);
        }
    }

    #[test]
    fn test_configure() {
        let rig = Rig::new();
        assert_eq!(rig.sensor.state(), DeviceState::BaselineSampling);
        assert!(!rig.trigger.high());
        assert!(!rig.enable.high());
        assert!(rig.sensor.is_baseline_running());
        assert_eq!(rig.sensor.timers().waketime(TimerId::Baseline), Some(PERIOD_US));
        assert!(!rig.sensor.timers().is_armed(TimerId::Session));
    }

    #[test]
    fn test_configure_rejects_zero_period() {
        let hardware = Hardware {
            transport: MockAdc::new(),
            trigger: MockPin::new(false),
            enable: MockPin::new(false),
        };
        let result = Sensor::configure(1, hardware, 0, &DEFAULT_TOUCH_CONFIG, 0);
        assert_eq!(result.err(), Some(Error::ZeroPeriod));
    }

    #[test]
    fn test_baseline_sampling() {
        let mut rig = Rig::new();
        rig.baseline(10, 15);

        assert_eq!(rig.sensor.baseline().last_average(), 10.0);
        assert_eq!(rig.sensor.baseline().len(), 15);
        assert_eq!(rig.now, 15 * PERIOD_US);
        assert_eq!(rig.frames.0.last(), Some(&Report::PeriodicRead { oid: 1, raw: 10, avg: 10 }));

        // Not ready: nothing read, still rescheduled
        let reads = rig.adc.reads();
        rig.adc.set(None);
        rig.step();
        assert_eq!(rig.adc.reads(), reads);
        assert_eq!(rig.sensor.baseline().len(), 15);
        assert_eq!(rig.sensor.timers().waketime(TimerId::Baseline), Some(17 * PERIOD_US));
    }

    #[test]
    fn test_transport_fault_skips_tick() {
        let mut rig = Rig::new();
        rig.baseline(10, 3);
        rig.adc.fail(true);
        rig.step();
        assert_eq!(rig.sensor.baseline().len(), 3);
        assert!(rig.sensor.is_baseline_running());

        rig.adc.fail(false);
        rig.baseline(20, 1);
        assert_eq!(rig.sensor.baseline().len(), 4);
    }

    #[test]
    fn test_no_touch_timeout() {
        let mut rig = Rig::new();
        rig.baseline(10, 15);
        assert_eq!(rig.sensor.baseline().last_average(), 10.0);

        rig.start(5, 3);
        assert!(rig.enable.high());
        assert_eq!(rig.sensor.state(), DeviceState::ProbingSession);
        assert_eq!(rig.sensor.probe().last_average(), 10.0);
        assert_eq!(rig.sensor.probe().len(), 15);

        for i in 0..5 {
            assert_eq!(rig.sensor.state(), DeviceState::ProbingSession);
            assert_eq!(rig.sensor.remaining_cycles(), 5 - i);
            rig.probe(Some(10));
            assert!(!rig.trigger.high());
        }

        assert!(!rig.sensor.detected());
        assert!(!rig.enable.high());
        assert_eq!(rig.sensor.state(), DeviceState::BaselineSampling);
        assert!(!rig.sensor.timers().is_armed(TimerId::Session));
        assert!(rig.sensor.is_baseline_running());
        assert_eq!(
            rig.frames.session_results(),
            vec![Report::SessionResult { oid: 1, detected: false, last_value: 10 }]
        );
    }

    #[test]
    fn test_touch_detected() {
        let mut rig = Rig::new();
        rig.baseline(10, 15);
        rig.start(100, 3);
        rig.probe(Some(10));
        assert!(!rig.sensor.detected());

        // 10 - 5 > 3 on the first low reading, even though the probe window
        // still holds mostly baseline samples
        rig.probe(Some(5));
        assert!(rig.sensor.detected());
        assert!(rig.trigger.high());
        assert_eq!(rig.sensor.remaining_cycles(), 1);
        assert_eq!(rig.sensor.state(), DeviceState::ProbingSession);
        assert_eq!(rig.sensor.last_baseline_average(), 10.0);
        assert_eq!(rig.sensor.last_probe_average(), 145.0 / 15.0);
        assert_eq!(
            rig.frames.0.last(),
            Some(&Report::ProbingRead { oid: 1, raw: 5, avg: 10 })
        );

        // Next tick ends the session; the trigger holds even on a quiet read
        let end = rig.now + REST;
        rig.probe(Some(10));
        assert_eq!(rig.now, end);
        assert_eq!(rig.sensor.state(), DeviceState::Cooldown);
        assert_eq!(rig.sensor.session_timer(), SessionTimer::Terminator);
        assert!(rig.trigger.high());
        assert!(!rig.enable.high());
        assert_eq!(
            rig.frames.session_results(),
            vec![Report::SessionResult { oid: 1, detected: true, last_value: 10 }]
        );
        assert_eq!(
            rig.sensor.timers().waketime(TimerId::Session),
            Some(end + DEFAULT_TOUCH_CONFIG.settle_ticks)
        );

        // Terminator releases the trigger and hands the ADC back
        rig.probe(None);
        assert_eq!(rig.now, end + 500_000);
        assert!(!rig.trigger.high());
        assert_eq!(rig.sensor.state(), DeviceState::BaselineSampling);
        assert_eq!(rig.sensor.session_timer(), SessionTimer::Probing);
        assert!(!rig.sensor.timers().is_armed(TimerId::Session));
        assert!(rig.sensor.is_baseline_running());
        assert_eq!(rig.frames.session_results().len(), 1);
    }

    #[test]
    fn test_touch_held_does_not_extend_session() {
        let mut rig = Rig::new();
        rig.baseline(10, 15);
        rig.start(100, 3);

        rig.probe(Some(2));
        assert!(rig.sensor.detected());
        rig.probe(Some(2));
        assert_eq!(rig.sensor.state(), DeviceState::Cooldown);
        assert_eq!(rig.frames.session_results().len(), 1);
    }

    #[test]
    fn test_small_drop_and_rise_never_detect() {
        let mut rig = Rig::new();
        rig.baseline(10, 15);
        rig.start(4, 3);

        rig.probe(Some(9));
        assert!(!rig.sensor.detected());
        rig.probe(Some(7));
        assert!(!rig.sensor.detected());
        rig.probe(Some(12));
        assert!(!rig.sensor.detected());
        rig.probe(Some(u16::MAX));
        assert!(!rig.sensor.detected());
        assert!(!rig.trigger.high());
        assert_eq!(rig.sensor.state(), DeviceState::BaselineSampling);
        assert_eq!(
            rig.frames.session_results(),
            vec![Report::SessionResult { oid: 1, detected: false, last_value: u16::MAX }]
        );
    }

    #[test]
    fn test_single_sample_window() {
        let config = TouchConfig { capacity: 1, ..DEFAULT_TOUCH_CONFIG };
        let mut rig = Rig::with_config(&config);
        rig.baseline(10, 1);
        rig.start(100, 3);

        rig.probe(Some(6));
        assert!(rig.sensor.detected());
        assert_eq!(rig.sensor.probe().history().collect::<Vec<_>>(), vec![6.0]);
    }

    #[test]
    fn test_not_ready_counts_against_budget() {
        let mut rig = Rig::new();
        rig.baseline(10, 15);
        rig.start(3, 3);
        let reads = rig.adc.reads();

        rig.probe(None);
        rig.probe(None);
        assert_eq!(rig.sensor.remaining_cycles(), 1);
        rig.probe(None);
        assert_eq!(rig.adc.reads(), reads);
        assert_eq!(rig.sensor.state(), DeviceState::BaselineSampling);
        assert_eq!(rig.sensor.probe().len(), 15);
    }

    #[test]
    fn test_start_rejects_bad_parameters() {
        let mut rig = Rig::new();
        rig.baseline(10, 15);

        for (timeout, rest, sens, err) in [
            (0, REST, 3, Error::ZeroTimeout),
            (10, 0, 3, Error::ZeroRestTicks),
            (10, REST, 0, Error::ZeroSensitivity),
            (10, MAX_INTERVAL + 1, 3, Error::IntervalTooLong),
        ] {
            assert_eq!(rig.sensor.start_session(rig.now, timeout, rest, sens), Err(err));
            assert_eq!(rig.sensor.state(), DeviceState::BaselineSampling);
            assert_eq!(rig.sensor.remaining_cycles(), 0);
            assert!(!rig.enable.high());
            assert!(rig.sensor.probe().is_empty());
            assert!(!rig.sensor.timers().is_armed(TimerId::Session));
        }
    }

    #[test]
    fn test_start_rejects_active_session() {
        let mut rig = Rig::new();
        rig.baseline(10, 15);
        rig.start(10, 3);
        rig.probe(Some(10));

        let remaining = rig.sensor.remaining_cycles();
        let waketime = rig.sensor.timers().waketime(TimerId::Session);
        let probe: Vec<f32> = rig.sensor.probe().history().collect();
        let baseline: Vec<f32> = rig.sensor.baseline().history().collect();

        assert_eq!(rig.sensor.start_session(rig.now, 50, 7, 9), Err(Error::SessionActive));
        assert_eq!(rig.sensor.remaining_cycles(), remaining);
        assert_eq!(rig.sensor.state(), DeviceState::ProbingSession);
        assert_eq!(rig.sensor.sensitivity(), 3);
        assert_eq!(rig.sensor.rest_ticks(), REST);
        assert_eq!(rig.sensor.timers().waketime(TimerId::Session), waketime);
        assert_eq!(rig.sensor.probe().history().collect::<Vec<_>>(), probe);
        assert_eq!(rig.sensor.baseline().history().collect::<Vec<_>>(), baseline);
    }

    #[test]
    fn test_start_rejected_during_cooldown() {
        let mut rig = Rig::new();
        rig.baseline(10, 15);
        rig.start(10, 3);
        rig.probe(Some(1));
        rig.probe(Some(1));
        assert_eq!(rig.sensor.state(), DeviceState::Cooldown);

        assert_eq!(rig.sensor.start_session(rig.now, 10, REST, 3), Err(Error::SessionActive));
        assert_eq!(rig.sensor.session_timer(), SessionTimer::Terminator);
    }

    #[test]
    fn test_adc_reset_and_init() {
        let mut rig = Rig::new();
        rig.baseline(10, 3);

        rig.sensor.reset_adc().unwrap();
        assert_eq!(rig.adc.resets(), 1);
        assert!(!rig.sensor.adc_initialized());
        assert_eq!(rig.sensor.start_session(rig.now, 10, REST, 3), Err(Error::AdcNotInitialized));
        assert_eq!(rig.sensor.read_value(), Err(Error::AdcNotInitialized));

        // Baseline keeps its schedule but reads nothing
        let reads = rig.adc.reads();
        rig.baseline(40, 2);
        assert_eq!(rig.adc.reads(), reads);
        assert_eq!(rig.sensor.baseline().len(), 3);

        rig.sensor.init_adc().unwrap();
        rig.sensor.init_adc().unwrap();
        assert_eq!(rig.adc.inits(), 1);
        assert!(rig.sensor.adc_initialized());
        rig.baseline(10, 1);
        assert_eq!(rig.sensor.baseline().len(), 4);
        rig.start(10, 3);
        assert_eq!(rig.sensor.state(), DeviceState::ProbingSession);
    }

    #[test]
    fn test_adc_reset_rejected_in_session() {
        let mut rig = Rig::new();
        rig.baseline(10, 15);
        rig.start(10, 3);
        assert_eq!(rig.sensor.reset_adc(), Err(Error::SessionActive));
        assert_eq!(rig.adc.resets(), 0);
        assert!(rig.sensor.adc_initialized());
    }

    #[test]
    fn test_adc_fault_keeps_state() {
        let mut rig = Rig::new();
        rig.adc.fail(true);
        assert_eq!(rig.sensor.reset_adc(), Err(Error::Transport));
        assert!(rig.sensor.adc_initialized());
        assert_eq!(rig.sensor.read_value(), Err(Error::Transport));
    }

    #[test]
    fn test_read_value() {
        let mut rig = Rig::new();
        rig.baseline(10, 15);
        rig.adc.set(Some(4321));
        assert_eq!(rig.sensor.read_value(), Ok(4321));
        assert_eq!(rig.sensor.baseline().last_average(), 10.0);
        assert_eq!(rig.sensor.last_raw(), 10);
    }

    #[test]
    fn test_baseline_pauses_during_session() {
        let mut rig = Rig::new();
        rig.baseline(10, 15);
        let baseline_wake = rig.sensor.timers().waketime(TimerId::Baseline).unwrap();

        // A long session outlives the next baseline tick
        rig.start(200, 3);
        rig.adc.set(Some(40));
        while rig.sensor.is_baseline_running() {
            rig.step();
        }
        assert!(rig.now >= baseline_wake);
        assert!(!rig.sensor.timers().is_armed(TimerId::Baseline));
        assert_eq!(rig.sensor.state(), DeviceState::ProbingSession);

        // Probing samples never reach the baseline
        assert_eq!(rig.sensor.baseline().last_average(), 10.0);
        assert_eq!(rig.sensor.baseline().history().count(), 15);

        // Resume while probing is harmless: the next baseline tick pauses again
        assert_eq!(rig.sensor.resume_baseline(rig.now), Resumed::Started);
        let wake = rig.sensor.timers().waketime(TimerId::Baseline).unwrap();
        while rig.now != wake {
            rig.step();
        }
        assert!(!rig.sensor.is_baseline_running());
        assert_eq!(rig.sensor.baseline().last_average(), 10.0);

        // Session end rearms baseline sampling
        while rig.sensor.state() == DeviceState::ProbingSession {
            rig.step();
        }
        assert!(rig.sensor.is_baseline_running());
        assert_eq!(rig.sensor.timers().waketime(TimerId::Baseline), Some(rig.now + PERIOD_US));
    }

    #[test]
    fn test_resume_is_idempotent() {
        let mut rig = Rig::new();
        rig.baseline(12, 6);
        let wake = rig.sensor.timers().waketime(TimerId::Baseline);

        assert_eq!(rig.sensor.resume_baseline(rig.now + 7), Resumed::AlreadyRunning);
        assert_eq!(rig.sensor.timers().waketime(TimerId::Baseline), wake);
        assert_eq!(rig.sensor.baseline().len(), 6);
        assert_eq!(rig.sensor.baseline().last_average(), 12.0);
    }

    #[test]
    fn test_probe_seeded_from_recent_baseline() {
        let config = TouchConfig { capacity: 4, ..DEFAULT_TOUCH_CONFIG };
        let mut rig = Rig::with_config(&config);
        for v in [1, 2, 3, 4, 5, 6] {
            rig.baseline(v, 1);
        }
        rig.start(10, 1);
        assert_eq!(rig.sensor.probe().history().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(rig.sensor.probe().last_average(), rig.sensor.baseline().last_average());
    }

    #[test]
    fn test_is_touch() {
        assert!(is_touch(10.0, 5.0, 3));
        assert!(!is_touch(10.0, 7.0, 3));
        assert!(!is_touch(10.0, 9.0, 3));
        assert!(!is_touch(10.0, 10.0, 1));
        assert!(!is_touch(10.0, 12.0, 1));
        assert!(!is_touch(10.0, 1000.0, 1));
    }
}
