use crate::pac;
use crate::hal::rcc::Rcc;
use touchprobe::Tick;

/// TIM2 as a free running 32 bit tick counter with one compare alarm.
///
/// The alarm (CC1) raises the TIM2 interrupt when the counter reaches the
/// programmed tick.
pub struct TickTimer {
    tim: pac::TIM2,
}

impl TickTimer {
    pub fn new(tim: pac::TIM2, rcc: &Rcc, tick_freq: u32) -> Self {
        let rccregs = unsafe { pac::Peripherals::steal().RCC };
        rccregs.apb1enr.modify(|_, w| w.tim2en().set_bit());

        // If pclk is prescaled from hclk, the frequency fed into the timers is doubled
        let clk_freq = if rcc.clocks.hclk().0 == rcc.clocks.pclk().0 {
            rcc.clocks.pclk().0
        } else {
            rcc.clocks.pclk().0 * 2
        };

        tim.psc.write(|w| w.psc().bits((clk_freq / tick_freq - 1) as u16));
        tim.arr.write(|w| w.arr().bits(u32::MAX));
        // Load the prescaler
        tim.egr.write(|w| w.ug().set_bit());
        tim.sr.write(|w| unsafe { w.bits(0) });

        // start counter
        tim.cr1.modify(|_, w| w.cen().set_bit());

        Self { tim }
    }

    pub fn now(&self) -> Tick {
        self.tim.cnt.read().bits()
    }

    /// Interrupt when the counter reaches `at`
    pub fn set_alarm(&mut self, at: Tick) {
        self.tim.ccr1.write(|w| unsafe { w.bits(at) });
        self.tim.sr.modify(|_, w| w.cc1if().clear_bit());
        self.tim.dier.modify(|_, w| w.cc1ie().set_bit());
    }

    pub fn clear_alarm(&mut self) {
        self.tim.dier.modify(|_, w| w.cc1ie().clear_bit());
    }

    /// Clear IRQ flags
    pub fn clear_irq(&mut self) {
        self.tim.sr.write(|w| unsafe { w.bits(0) });
    }
}
