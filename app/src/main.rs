#![no_main]
#![no_std]

use core::cell::RefCell;
use core::fmt::Write;
use cortex_m;
use cortex_m::interrupt::Mutex;
use cortex_m_rt::entry;
use log::{error, info};
use panic_halt as _;

use stm32f0xx_hal as hal;

use touchprobe::command::{Command, LineBuffer, Report, Reporter};
use touchprobe::dispatch::Dispatcher;
use touchprobe::timer::is_before;
use touchprobe::Tick;

use crate::hal::pac;
use crate::hal::pac::interrupt;
use crate::hal::prelude::*;

mod board;
mod config;
mod logger;
mod serial;
mod tick_timer;

use board::{ProbeBoard, Resources};
use tick_timer::TickTimer;

/// Writes report frames to the host serial line
struct SerialReporter;

impl Reporter for SerialReporter {
    fn report(&mut self, report: Report) {
        let mut w = serial::uart1::writer();
        write!(w, "{}\r\n", report).ok();
    }
}

/// Everything shared between the command loop and the tick interrupt
struct Firmware {
    dispatcher: Dispatcher<ProbeBoard>,
    timer: TickTimer,
}

impl Firmware {
    /// Parse and run one command line
    fn execute(&mut self, line: &str) {
        let now = self.timer.now();
        let result = Command::parse(line)
            .and_then(|cmd| self.dispatcher.handle(now, &cmd, &mut SerialReporter));
        if let Err(e) = result {
            error!("Dropped request '{}': {}", line, e);
            SerialReporter.report(Report::Shutdown(e));
        }
        let next = self.dispatcher.next_wake();
        self.schedule(next);
    }

    /// Run due timers from the TIM2 interrupt
    fn on_alarm(&mut self) {
        self.timer.clear_irq();
        let now = self.timer.now();
        let next = self.dispatcher.run_timers(now, &mut SerialReporter);
        self.schedule(next);
    }

    fn schedule(&mut self, next: Option<Tick>) {
        match next {
            Some(at) => {
                self.timer.set_alarm(at);
                // Compare match only fires on equality; catch up if `at` already passed
                if !is_before(self.timer.now(), at) {
                    pac::NVIC::pend(pac::Interrupt::TIM2);
                }
            }
            None => self.timer.clear_alarm(),
        }
    }
}

static FIRMWARE: Mutex<RefCell<Option<Firmware>>> = Mutex::new(RefCell::new(None));

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();
    let mut nvic = cp.NVIC;

    let mut flash = dp.FLASH;
    let mut rcc = dp.RCC.configure().sysclk(config::SYSCLK_MHZ.mhz()).freeze(&mut flash);
    let gpioa = dp.GPIOA.split(&mut rcc);
    let gpiob = dp.GPIOB.split(&mut rcc);

    // A library requiring a critical section to set a gpio AF register is bad and I just won't.
    let fake_cs = unsafe { cortex_m::interrupt::CriticalSection::new() };

    let tx_pin = gpiob.pb6.into_alternate_af0(&fake_cs);
    let rx_pin = gpiob.pb7.into_alternate_af0(&fake_cs);
    let uart = hal::serial::Serial::usart1(dp.USART1, (tx_pin, rx_pin), config::UART_BAUD.bps(), &mut rcc);
    serial::uart1::init(uart, config::UART_IRQ_PRIO);
    logger::init(config::LOG_LEVEL);

    // Initialize probe pins
    let sck = gpioa.pa5.into_alternate_af0(&fake_cs);
    let miso = gpioa.pa6.into_alternate_af0(&fake_cs);
    let mosi = gpioa.pa7.into_alternate_af0(&fake_cs);
    let mut cs = gpioa.pa4.into_push_pull_output(&fake_cs);
    cs.set_high().ok();
    let ready = gpiob.pb3.into_pull_up_input(&fake_cs);
    let mut trigger = gpiob.pb8.into_push_pull_output(&fake_cs);
    trigger.set_low().ok();
    let mut enable = gpiob.pb9.into_push_pull_output(&fake_cs);
    enable.set_low().ok();

    let spi = hal::spi::Spi::spi1(
        dp.SPI1,
        (sck, miso, mosi),
        embedded_hal_0_2::spi::MODE_0,
        config::SPI_FREQ_KHZ.khz(),
        &mut rcc,
    );

    let board = ProbeBoard::new(Resources { spi, cs, ready, trigger, enable });
    let timer = TickTimer::new(dp.TIM2, &rcc, config::TOUCH_CONFIG.tick_freq);

    cortex_m::interrupt::free(|cs| {
        FIRMWARE.borrow(cs).borrow_mut().replace(Firmware {
            dispatcher: Dispatcher::new(board, config::TOUCH_CONFIG),
            timer,
        });
    });

    unsafe {
        nvic.set_priority(pac::Interrupt::TIM2, config::TICK_TIMER_IRQ_PRIO);
        cortex_m::peripheral::NVIC::unmask(pac::Interrupt::TIM2);
    }

    info!("touchprobe ready");

    let mut line = LineBuffer::<{ serial::uart1::LINE_LEN }>::new();
    loop {
        if !serial::uart1::read_line(&mut line) {
            cortex_m::asm::wfi();
            continue;
        }
        if !line.as_str().trim().is_empty() {
            cortex_m::interrupt::free(|cs| {
                if let Some(fw) = FIRMWARE.borrow(cs).borrow_mut().as_mut() {
                    fw.execute(line.as_str());
                }
            });
        }
    }
}

#[interrupt]
fn TIM2() {
    cortex_m::interrupt::free(|cs| {
        if let Some(fw) = FIRMWARE.borrow(cs).borrow_mut().as_mut() {
            fw.on_alarm();
        }
    });
}
