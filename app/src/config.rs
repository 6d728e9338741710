//! Board wiring and firmware constants

use log::LevelFilter;
use touchprobe::{TouchConfig, DEFAULT_TOUCH_CONFIG};

/// Pin number as sent by the host: port index * 16 + pin
const fn gpio(port: u8, pin: u32) -> u32 {
    (port - b'A') as u32 * 16 + pin
}

/// The only SPI bus on the board, carrying the MCP3462R
pub const SPI_OID: u8 = 0;
/// MCP3462R IRQ output, PB3
pub const ADC_INT_PIN: u32 = gpio(b'B', 3);
/// Probe trigger output, PB8
pub const TRIGGER_OUT_PIN: u32 = gpio(b'B', 8);
/// Probe enable output, PB9
pub const PI_EN_PIN: u32 = gpio(b'B', 9);

pub const SYSCLK_MHZ: u32 = 48;
pub const SPI_FREQ_KHZ: u32 = 1_000;
pub const UART_BAUD: u32 = 250_000;

pub const TICK_TIMER_IRQ_PRIO: u8 = 1;
pub const UART_IRQ_PRIO: u8 = 4;

pub const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// TIM2 counts microseconds
pub const TOUCH_CONFIG: TouchConfig = TouchConfig {
    tick_freq: 1_000_000,
    ..DEFAULT_TOUCH_CONFIG
};
