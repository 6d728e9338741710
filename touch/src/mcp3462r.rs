//! Driver for the MCP3462R delta-sigma ADC.
//!
//! Only what the touch probe needs: a one-time register setup, the data ready
//! line and 16 bit conversion reads. Every SPI frame starts with a command
//! byte `0b01AAAACC`: device address 01, register address AAAA, command CC.

use embedded_hal::digital::InputPin;
use embedded_hal::spi::SpiDevice;
use log::debug;

/// Static read of ADCDATA (register 0x0)
pub const READ_CMD: u8 = 0b0100_0011;
/// Fast command: full device reset
pub const FULL_RESET: u8 = 0b0111_1000;
/// Incremental write starting at CONFIG0 (register 0x1)
pub const CONFIG0_WRITE: u8 = 0b0100_0110;

/// Register contents written from CONFIG0 onward
pub const CONFIG_DATA: [u8; 6] = [
    0b0110_0011, // CONFIG0: internal clock, conversion mode
    0b0000_1100, // CONFIG1: default oversampling
    0b1011_0011, // CONFIG2: gain x32
    0b1100_0000, // CONFIG3: continuous conversion, 16 bit data
    0b0000_0110, // IRQ: IRQ pin push-pull, data ready only
    0b0000_0001, // MUX: CH0 against CH1
];

/// Level of the IRQ line while a conversion result is pending
const ADC_ACTIVE_STATE: bool = false;

/// A source of raw single channel readings
pub trait Transport {
    type Error: core::fmt::Debug;

    /// Reset the converter and load its sampling setup
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Full reset. The converter stays idle until the next `init`.
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// Returns true if a conversion result is waiting
    fn is_ready(&mut self) -> Result<bool, Self::Error>;

    /// Read the latest conversion result
    fn read_raw(&mut self) -> Result<u16, Self::Error>;
}

#[derive(Debug)]
pub enum BusError<S, P> {
    Spi(S),
    Pin(P),
}

pub struct Mcp3462r<SPI, RDY> {
    spi: SPI,
    ready: RDY,
}

impl<SPI, RDY> Mcp3462r<SPI, RDY>
where
    SPI: SpiDevice,
    RDY: InputPin,
{
    pub fn new(spi: SPI, ready: RDY) -> Self {
        Self { spi, ready }
    }

    pub fn release(self) -> (SPI, RDY) {
        (self.spi, self.ready)
    }
}

impl<SPI, RDY> Transport for Mcp3462r<SPI, RDY>
where
    SPI: SpiDevice,
    RDY: InputPin,
{
    type Error = BusError<SPI::Error, RDY::Error>;

    /// Reset the device and load the touch sensing register set
    fn init(&mut self) -> Result<(), Self::Error> {
        self.reset()?;

        let mut frame = [0u8; 1 + CONFIG_DATA.len()];
        frame[0] = CONFIG0_WRITE;
        frame[1..].copy_from_slice(&CONFIG_DATA);
        self.spi.write(&frame).map_err(BusError::Spi)?;

        debug!("MCP3462R configured");
        Ok(())
    }

    /// Return every register to its power-on value
    fn reset(&mut self) -> Result<(), Self::Error> {
        self.spi.write(&[FULL_RESET]).map_err(BusError::Spi)
    }

    fn is_ready(&mut self) -> Result<bool, Self::Error> {
        let high = self.ready.is_high().map_err(BusError::Pin)?;
        Ok(high == ADC_ACTIVE_STATE)
    }

    fn read_raw(&mut self) -> Result<u16, Self::Error> {
        let mut msg = [READ_CMD, 0x00, 0x00];
        self.spi.transfer_in_place(&mut msg).map_err(BusError::Spi)?;
        Ok(u16::from_be_bytes([msg[1], msg[2]]))
    }
}
