use core::fmt;

/// Faults raised by touch sensor requests.
///
/// Everything except `Transport` and `Pin` is a caller programming error: the
/// request is dropped and nothing is retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A request arrived before the sensor was configured
    NotConfigured,
    /// The sensor was already configured
    AlreadyConfigured,
    /// The request addressed a different sensor
    OidMismatch { expected: u8, got: u8 },
    /// The board has no such pin wired to the sensor
    UnknownPin(u32),
    /// The board has no such SPI bus
    UnknownBus(u8),
    /// A session is already running or still cooling down
    SessionActive,
    /// Session timeout cycles must be greater than 0
    ZeroTimeout,
    /// Session rest ticks must be greater than 0
    ZeroRestTicks,
    /// Sensitivity must be greater than 0
    ZeroSensitivity,
    /// The baseline sample period rounds to zero ticks
    ZeroPeriod,
    /// An interval is too long for the wrapping tick counter
    IntervalTooLong,
    /// Estimator capacity outside `1..=BUFFER_SIZE`
    CapacityOutOfRange(usize),
    /// Command name not recognized
    UnknownCommand,
    /// Command line lacks a required `key=value` field
    MissingField(&'static str),
    /// A field value failed to parse
    InvalidField(&'static str),
    /// The ADC was reset and has not been initialized since
    AdcNotInitialized,
    /// The ADC bus failed
    Transport,
    /// A GPIO write failed
    Pin,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotConfigured => f.write_str("Touch sensor ADC HW is not configured"),
            Error::AlreadyConfigured => f.write_str("Touch sensor ADC HW is already configured"),
            Error::OidMismatch { expected, got } => write!(
                f,
                "Touch sensor ADC OID does not match the configured OID (expected {}, got {})",
                expected, got
            ),
            Error::UnknownPin(pin) => write!(f, "Pin {} is not wired to the touch sensor", pin),
            Error::UnknownBus(oid) => write!(f, "Unknown SPI bus oid {}", oid),
            Error::SessionActive => f.write_str("Touch sensing session is already active"),
            Error::ZeroTimeout => f.write_str("Timeout cycles must be greater than 0"),
            Error::ZeroRestTicks => f.write_str("Rest ticks must be greater than 0"),
            Error::ZeroSensitivity => f.write_str("Sensitivity must be greater than 0"),
            Error::ZeroPeriod => f.write_str("Baseline sample period must be greater than 0"),
            Error::IntervalTooLong => f.write_str("Interval exceeds half the tick counter range"),
            Error::CapacityOutOfRange(capacity) => {
                write!(f, "Rolling average capacity {} out of range", capacity)
            }
            Error::UnknownCommand => f.write_str("Unknown command"),
            Error::MissingField(key) => write!(f, "Missing field {}", key),
            Error::InvalidField(key) => write!(f, "Invalid value for field {}", key),
            Error::AdcNotInitialized => {
                f.write_str("Touch sensor is not configured. Please initialize it first.")
            }
            Error::Transport => f.write_str("ADC transport failure"),
            Error::Pin => f.write_str("GPIO write failure"),
        }
    }
}
