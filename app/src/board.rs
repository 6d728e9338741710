//! Binds the probe hardware on this board to the touch sensor.
//!
//! stm32f0xx-hal implements the embedded-hal 0.2 traits while the sensor
//! crate is written against embedded-hal 1.0, so the pins and SPI bus are
//! wrapped in thin adapters here.

use core::convert::Infallible;

use embedded_hal::digital;
use embedded_hal::spi::{self, ErrorKind, Operation};
use embedded_hal_0_2::blocking::spi::{Transfer, Write};
use embedded_hal_0_2::digital::v2::{InputPin as _, OutputPin as _};
use log::info;

use touchprobe::command::SensorConfig;
use touchprobe::dispatch::Board;
use touchprobe::mcp3462r::{Mcp3462r, Transport};
use touchprobe::session::Hardware;
use touchprobe::Error;

use crate::config;
use crate::hal::gpio::{gpioa, gpiob, Alternate, Input, Output, PullUp, PushPull, AF0};
use crate::hal::pac;
use crate::hal::spi::{EightBit, Spi as HalSpi};

pub type Spi1 = HalSpi<
    pac::SPI1,
    gpioa::PA5<Alternate<AF0>>,
    gpioa::PA6<Alternate<AF0>>,
    gpioa::PA7<Alternate<AF0>>,
    EightBit,
>;
pub type CsPin = gpioa::PA4<Output<PushPull>>;
pub type ReadyPin = gpiob::PB3<Input<PullUp>>;
pub type TriggerPin = gpiob::PB8<Output<PushPull>>;
pub type EnablePin = gpiob::PB9<Output<PushPull>>;

pub type Adc = Mcp3462r<SpiDev<Spi1, CsPin>, Pin<ReadyPin>>;

/// embedded-hal 1.0 view of a HAL GPIO pin
pub struct Pin<P>(pub P);

impl<P> digital::ErrorType for Pin<P> {
    type Error = Infallible;
}

impl<P> digital::OutputPin for Pin<P>
where
    P: embedded_hal_0_2::digital::v2::OutputPin<Error = Infallible>,
{
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.set_low()
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.set_high()
    }
}

impl<P> digital::InputPin for Pin<P>
where
    P: embedded_hal_0_2::digital::v2::InputPin<Error = Infallible>,
{
    fn is_high(&mut self) -> Result<bool, Infallible> {
        self.0.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.0.is_low()
    }
}

#[derive(Debug)]
pub struct SpiFault;

impl spi::Error for SpiFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// A HAL SPI bus plus its chip select, as an embedded-hal 1.0 device
pub struct SpiDev<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> SpiDev<SPI, CS> {
    pub fn new(spi: SPI, cs: CS) -> Self {
        Self { spi, cs }
    }
}

impl<SPI, CS> spi::ErrorType for SpiDev<SPI, CS> {
    type Error = SpiFault;
}

impl<SPI, CS> spi::SpiDevice for SpiDev<SPI, CS>
where
    SPI: Transfer<u8> + Write<u8>,
    CS: embedded_hal_0_2::digital::v2::OutputPin<Error = Infallible>,
{
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), SpiFault> {
        self.cs.set_low().ok();
        let result = operations.iter_mut().try_for_each(|op| match op {
            Operation::Write(bytes) => self.spi.write(*bytes).map_err(|_| SpiFault),
            Operation::TransferInPlace(bytes) => {
                self.spi.transfer(bytes).map(|_| ()).map_err(|_| SpiFault)
            }
            Operation::Read(bytes) => {
                bytes.fill(0);
                self.spi.transfer(bytes).map(|_| ()).map_err(|_| SpiFault)
            }
            Operation::Transfer(read, write) => {
                let n = read.len().min(write.len());
                read[..n].copy_from_slice(&write[..n]);
                read[n..].fill(0);
                self.spi.transfer(read).map(|_| ()).map_err(|_| SpiFault)
            }
            Operation::DelayNs(ns) => {
                cortex_m::asm::delay(*ns / 1000 * config::SYSCLK_MHZ + 1);
                Ok(())
            }
        });
        self.cs.set_high().ok();
        result
    }
}

/// Probe peripherals, handed out once on `cfg_ts_adc`
pub struct Resources {
    pub spi: Spi1,
    pub cs: CsPin,
    pub ready: ReadyPin,
    pub trigger: TriggerPin,
    pub enable: EnablePin,
}

pub struct ProbeBoard {
    resources: Option<Resources>,
}

impl ProbeBoard {
    pub fn new(resources: Resources) -> Self {
        Self {
            resources: Some(resources),
        }
    }
}

impl Board for ProbeBoard {
    type Transport = Adc;
    type Trigger = Pin<TriggerPin>;
    type Enable = Pin<EnablePin>;

    fn bind(
        &mut self,
        cfg: &SensorConfig,
    ) -> Result<Hardware<Self::Transport, Self::Trigger, Self::Enable>, Error> {
        if cfg.spi_oid != config::SPI_OID {
            return Err(Error::UnknownBus(cfg.spi_oid));
        }
        for (requested, wired) in [
            (cfg.adc_int_pin, config::ADC_INT_PIN),
            (cfg.trigger_out_pin, config::TRIGGER_OUT_PIN),
            (cfg.pi_en_pin, config::PI_EN_PIN),
        ] {
            if requested != wired {
                return Err(Error::UnknownPin(requested));
            }
        }

        let res = self.resources.take().ok_or(Error::AlreadyConfigured)?;
        let mut adc = Mcp3462r::new(SpiDev::new(res.spi, res.cs), Pin(res.ready));
        if adc.init().is_err() {
            let (spi, ready) = adc.release();
            self.resources = Some(Resources {
                spi: spi.spi,
                cs: spi.cs,
                ready: ready.0,
                trigger: res.trigger,
                enable: res.enable,
            });
            return Err(Error::Transport);
        }
        info!("MCP3462R initialized on SPI1");

        Ok(Hardware {
            transport: adc,
            trigger: Pin(res.trigger),
            enable: Pin(res.enable),
        })
    }
}
