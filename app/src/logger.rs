use core::fmt::Write;

use log::{LevelFilter, Metadata, Record};

use crate::serial::uart1;

/// Sends log records over the host serial line, one `LEVEL: message` per line
struct UartLogger;

impl log::Log for UartLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let mut w = uart1::writer();
            write!(w, "{}: {}\r\n", record.level(), record.args()).ok();
        }
    }

    fn flush(&self) {}
}

static LOGGER: UartLogger = UartLogger;

/// Must be called once, after the serial port is up and before interrupts
/// that log are enabled
pub fn init(level: LevelFilter) {
    // thumbv6m has no atomic compare-and-swap, so the racy setters are the only option
    unsafe {
        log::set_logger_racy(&LOGGER).ok();
        log::set_max_level_racy(level);
    }
}
