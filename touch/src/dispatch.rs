use embedded_hal::digital::OutputPin;
use log::error;

use crate::command::{Command, Report, Reporter, SensorConfig};
use crate::mcp3462r::Transport;
use crate::session::{Hardware, TouchSensor};
use crate::timer::Tick;
use crate::{DeviceState, Error, TouchConfig};

/// Hands out the peripherals a `cfg_ts_adc` command asks for
pub trait Board {
    type Transport: Transport;
    type Trigger: OutputPin;
    type Enable: OutputPin;

    /// Check the requested bus and pins against the board wiring and give
    /// them up. Fails if they are unknown or were already handed out.
    fn bind(
        &mut self,
        config: &SensorConfig,
    ) -> Result<Hardware<Self::Transport, Self::Trigger, Self::Enable>, Error>;
}

pub type BoardSensor<B> =
    TouchSensor<<B as Board>::Transport, <B as Board>::Trigger, <B as Board>::Enable>;

/// Routes host commands and timer wakeups to the sensor slot
pub struct Dispatcher<B: Board> {
    board: B,
    config: TouchConfig,
    sensor: Option<BoardSensor<B>>,
}

impl<B: Board> Dispatcher<B> {
    pub fn new(board: B, config: TouchConfig) -> Self {
        Self {
            board,
            config,
            sensor: None,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.sensor
            .as_ref()
            .map_or(DeviceState::Unconfigured, |sensor| sensor.state())
    }

    pub fn sensor(&self) -> Option<&BoardSensor<B>> {
        self.sensor.as_ref()
    }

    /// Execute one command, sending any answer frame to `reporter`. Faults are
    /// logged and returned; the caller reports them and drops the request.
    pub fn handle<R: Reporter>(
        &mut self,
        now: Tick,
        command: &Command,
        reporter: &mut R,
    ) -> Result<(), Error> {
        self.execute(now, command, reporter).map_err(|e| {
            error!("Command for OID={} failed: {}", command.oid(), e);
            e
        })
    }

    fn execute<R: Reporter>(
        &mut self,
        now: Tick,
        command: &Command,
        reporter: &mut R,
    ) -> Result<(), Error> {
        match command {
            Command::Configure(cfg) => {
                if self.sensor.is_some() {
                    return Err(Error::AlreadyConfigured);
                }
                self.config.ticks_from_us(cfg.cycle_us)?;
                let hardware = self.board.bind(cfg)?;
                let sensor =
                    TouchSensor::configure(cfg.oid, hardware, cfg.cycle_us, &self.config, now)?;
                self.sensor = Some(sensor);
                Ok(())
            }
            Command::StartSession(req) => self.lookup(req.oid)?.start_session(
                now,
                req.timeout_cycles,
                req.rest_ticks,
                req.sensitivity,
            ),
            Command::ResumeBaseline { oid } => {
                self.lookup(*oid)?.resume_baseline(now);
                Ok(())
            }
            Command::InitAdc { oid } => {
                self.lookup(*oid)?.init_adc()?;
                reporter.report(Report::AdcState { oid: *oid, initialized: true });
                Ok(())
            }
            Command::ResetAdc { oid } => {
                self.lookup(*oid)?.reset_adc()?;
                reporter.report(Report::AdcState { oid: *oid, initialized: false });
                Ok(())
            }
            Command::ReadValue { oid } => {
                let value = self.lookup(*oid)?.read_value()?;
                reporter.report(Report::Value { oid: *oid, value });
                Ok(())
            }
        }
    }

    fn lookup(&mut self, oid: u8) -> Result<&mut BoardSensor<B>, Error> {
        let sensor = self.sensor.as_mut().ok_or(Error::NotConfigured)?;
        if sensor.oid() != oid {
            return Err(Error::OidMismatch {
                expected: sensor.oid(),
                got: oid,
            });
        }
        Ok(sensor)
    }

    /// Run due timers. Returns the next alarm tick, if any.
    pub fn run_timers<R: Reporter>(&mut self, now: Tick, reporter: &mut R) -> Option<Tick> {
        self.sensor.as_mut()?.run_timers(now, reporter)
    }

    pub fn next_wake(&self) -> Option<Tick> {
        self.sensor.as_ref()?.next_wake()
    }
}
