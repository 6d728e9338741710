//! Host side stand-ins for pins, the SPI bus, the ADC and the report channel.
//!
//! Handles share their state through `Rc`, so a test can keep a clone and
//! inspect or drive the hardware after moving the first handle into a sensor.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::spi::{self, Operation, SpiDevice};

use crate::command::{Report, Reporter};
use crate::mcp3462r::Transport;

#[derive(Clone, Debug)]
pub struct MockPin(Rc<Cell<bool>>);

impl MockPin {
    pub fn new(high: bool) -> Self {
        Self(Rc::new(Cell::new(high)))
    }

    pub fn set(&self, high: bool) {
        self.0.set(high)
    }

    pub fn high(&self) -> bool {
        self.0.get()
    }
}

impl digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.set(true);
        Ok(())
    }
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.get())
    }
}

#[derive(Default)]
struct SpiState {
    frames: Vec<Vec<u8>>,
    responses: VecDeque<Vec<u8>>,
}

/// Records every transaction as one frame of written bytes
#[derive(Clone, Default)]
pub struct MockSpi(Rc<RefCell<SpiState>>);

impl MockSpi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the bytes clocked in during the next in-place transfer
    pub fn respond(&self, bytes: &[u8]) {
        self.0.borrow_mut().responses.push_back(bytes.to_vec());
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.0.borrow().frames.clone()
    }
}

impl spi::ErrorType for MockSpi {
    type Error = Infallible;
}

impl SpiDevice for MockSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        let mut state = self.0.borrow_mut();
        let mut frame = Vec::new();
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => frame.extend_from_slice(bytes),
                Operation::TransferInPlace(bytes) => {
                    frame.extend_from_slice(bytes);
                    if let Some(response) = state.responses.pop_front() {
                        let n = response.len().min(bytes.len());
                        bytes[..n].copy_from_slice(&response[..n]);
                    }
                }
                Operation::Transfer(read, write) => {
                    frame.extend_from_slice(write);
                    read.fill(0);
                }
                Operation::Read(read) => read.fill(0),
                Operation::DelayNs(_) => (),
            }
        }
        state.frames.push(frame);
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
pub struct AdcFault;

/// An ADC whose next reading is set by the test. `None` means not ready.
#[derive(Clone, Default)]
pub struct MockAdc {
    value: Rc<Cell<Option<u16>>>,
    fail: Rc<Cell<bool>>,
    reads: Rc<Cell<usize>>,
    inits: Rc<Cell<usize>>,
    resets: Rc<Cell<usize>>,
}

impl MockAdc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: Option<u16>) {
        self.value.set(value)
    }

    pub fn fail(&self, fail: bool) {
        self.fail.set(fail)
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    pub fn inits(&self) -> usize {
        self.inits.get()
    }

    pub fn resets(&self) -> usize {
        self.resets.get()
    }

    fn check(&self) -> Result<(), AdcFault> {
        if self.fail.get() {
            return Err(AdcFault);
        }
        Ok(())
    }
}

impl Transport for MockAdc {
    type Error = AdcFault;

    fn init(&mut self) -> Result<(), AdcFault> {
        self.check()?;
        self.inits.set(self.inits.get() + 1);
        Ok(())
    }

    fn reset(&mut self) -> Result<(), AdcFault> {
        self.check()?;
        self.resets.set(self.resets.get() + 1);
        Ok(())
    }

    fn is_ready(&mut self) -> Result<bool, AdcFault> {
        self.check()?;
        Ok(self.value.get().is_some())
    }

    fn read_raw(&mut self) -> Result<u16, AdcFault> {
        self.check()?;
        self.reads.set(self.reads.get() + 1);
        self.value.get().ok_or(AdcFault)
    }
}

/// Collects reports in order
#[derive(Default)]
pub struct Frames(pub Vec<Report>);

impl Frames {
    pub fn session_results(&self) -> Vec<Report> {
        self.0
            .iter()
            .filter(|r| matches!(r, Report::SessionResult { .. }))
            .copied()
            .collect()
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }
}

impl Reporter for Frames {
    fn report(&mut self, report: Report) {
        self.0.push(report)
    }
}
