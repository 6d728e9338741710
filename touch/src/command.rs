//! Host command and report frames.
//!
//! Commands arrive as one line of `name key=value ...`; reports go out in the
//! same shape. Field names match the host side configuration module.

use core::fmt;
use core::str::FromStr;

use heapless::String;

use crate::Error;

/// Arguments of `cfg_ts_adc`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorConfig {
    pub oid: u8,
    /// Bus carrying the ADC
    pub spi_oid: u8,
    /// ADC data ready input, active low
    pub adc_int_pin: u32,
    /// Output raised on touch
    pub trigger_out_pin: u32,
    /// Probe enable output, high during a session
    pub pi_en_pin: u32,
    /// Baseline sample period in microseconds
    pub cycle_us: u32,
}

/// Arguments of `start_ts_session`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionRequest {
    pub oid: u8,
    /// Probing ticks before the session gives up
    pub timeout_cycles: u32,
    /// Ticks between probing ticks
    pub rest_ticks: u32,
    /// Minimum drop below the baseline that counts as a touch
    pub sensitivity: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Configure(SensorConfig),
    StartSession(SessionRequest),
    ResumeBaseline { oid: u8 },
    /// Reload the ADC register set after a reset
    InitAdc { oid: u8 },
    /// Full ADC reset; sampling stops until `InitAdc`
    ResetAdc { oid: u8 },
    /// Report one conversion result outside the sampling schedule
    ReadValue { oid: u8 },
}

impl Command {
    pub const CONFIGURE: &'static str = "cfg_ts_adc";
    pub const START_SESSION: &'static str = "start_ts_session";
    pub const RESUME_BASELINE: &'static str = "resume_rolling_avg";
    pub const INIT_ADC: &'static str = "init_ts";
    pub const RESET_ADC: &'static str = "reset_ts";
    pub const READ_VALUE: &'static str = "get_ts_val";

    /// Parse one command line
    pub fn parse(line: &str) -> Result<Self, Error> {
        let line = line.trim();
        let (name, rest) = line.split_once(' ').unwrap_or((line, ""));
        let args = Args(rest);

        match name {
            Self::CONFIGURE => Ok(Command::Configure(SensorConfig {
                oid: args.get("oid")?,
                spi_oid: args.get("spi_oid")?,
                adc_int_pin: args.get("adc_int_pin")?,
                trigger_out_pin: args.get("trigger_out_pin")?,
                pi_en_pin: args.get("PI_EN_pin")?,
                cycle_us: args.get("cycle_us")?,
            })),
            Self::START_SESSION => Ok(Command::StartSession(SessionRequest {
                oid: args.get("oid")?,
                timeout_cycles: args.get("timeout_cycles")?,
                rest_ticks: args.get("rest_ticks")?,
                sensitivity: args.get("sensitivity")?,
            })),
            Self::RESUME_BASELINE => Ok(Command::ResumeBaseline {
                oid: args.get("oid")?,
            }),
            Self::INIT_ADC => Ok(Command::InitAdc { oid: args.get("oid")? }),
            Self::RESET_ADC => Ok(Command::ResetAdc { oid: args.get("oid")? }),
            Self::READ_VALUE => Ok(Command::ReadValue { oid: args.get("oid")? }),
            _ => Err(Error::UnknownCommand),
        }
    }

    /// The sensor a command is addressed to
    pub fn oid(&self) -> u8 {
        match self {
            Command::Configure(cfg) => cfg.oid,
            Command::StartSession(req) => req.oid,
            Command::ResumeBaseline { oid }
            | Command::InitAdc { oid }
            | Command::ResetAdc { oid }
            | Command::ReadValue { oid } => *oid,
        }
    }
}

struct Args<'a>(&'a str);

impl Args<'_> {
    fn get<T: FromStr>(&self, key: &'static str) -> Result<T, Error> {
        self.0
            .split_ascii_whitespace()
            .filter_map(|field| field.split_once('='))
            .find(|(k, _)| *k == key)
            .ok_or(Error::MissingField(key))
            .and_then(|(_, v)| v.parse().map_err(|_| Error::InvalidField(key)))
    }
}

/// Outbound status frames
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Report {
    /// Outcome of a probing session
    SessionResult { oid: u8, detected: bool, last_value: u16 },
    /// A baseline sample was taken
    PeriodicRead { oid: u8, raw: u16, avg: u16 },
    /// A probing sample was taken; `avg` is the baseline it was compared to
    ProbingRead { oid: u8, raw: u16, avg: u16 },
    /// ADC setup state after an init or reset request
    AdcState { oid: u8, initialized: bool },
    /// Answer to `get_ts_val`
    Value { oid: u8, value: u16 },
    /// A request failed and was dropped
    Shutdown(Error),
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::SessionResult { oid, detected, last_value } => write!(
                f,
                "Ts_session_result oid={} status={} lstValue={}",
                oid, *detected as u8, last_value
            ),
            Report::PeriodicRead { oid, raw, avg } => {
                write!(f, "Periodic_read oid={} raw={} avg={}", oid, raw, avg)
            }
            Report::ProbingRead { oid, raw, avg } => {
                write!(f, "Probing_read oid={} raw={} avg={}", oid, raw, avg)
            }
            Report::AdcState { oid, initialized } => {
                write!(f, "Ts_adc_state oid={} initialized={}", oid, *initialized as u8)
            }
            Report::Value { oid, value } => write!(f, "Ts_value oid={} value={}", oid, value),
            Report::Shutdown(e) => write!(f, "shutdown msg={}", e),
        }
    }
}

/// Sink for outbound frames
pub trait Reporter {
    fn report(&mut self, report: Report);
}

/// Assembles received bytes into command lines of at most `N` bytes.
///
/// '\r' is dropped. A line that overflows is thrown away up to and including
/// its '\n', so no tail of it is ever handed out as a command.
pub struct LineBuffer<const N: usize> {
    line: String<N>,
    complete: bool,
    overflowed: bool,
}

impl<const N: usize> LineBuffer<N> {
    pub const fn new() -> Self {
        Self {
            line: String::new(),
            complete: false,
            overflowed: false,
        }
    }

    /// Feed one byte. Returns true when it finished a line, which stays in
    /// `as_str` until the next call.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.complete {
            self.line.clear();
            self.complete = false;
        }
        match byte {
            b'\n' if self.overflowed => {
                self.overflowed = false;
                false
            }
            b'\n' => {
                self.complete = true;
                true
            }
            b'\r' => false,
            _ if self.overflowed => false,
            _ => {
                if self.line.push(byte as char).is_err() {
                    self.line.clear();
                    self.overflowed = true;
                }
                false
            }
        }
    }

    pub fn as_str(&self) -> &str {
        self.line.as_str()
    }
}
