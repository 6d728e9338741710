/// Interrupt driven USART1 carrying host commands in and reports and log lines out
pub mod uart1 {
    use crate::hal::{
        gpio::{gpiob, Alternate, AF0},
        pac,
        prelude::*,
        serial::{Event, Serial},
    };
    use crate::interrupt;
    use heapless::spsc::{Consumer, Producer, Queue};
    use touchprobe::command::LineBuffer;

    const TX_Q_SIZE: usize = 256;
    const RX_Q_SIZE: usize = 64;
    /// Longest command line accepted
    pub const LINE_LEN: usize = 128;

    pub type Port = Serial<pac::USART1, gpiob::PB6<Alternate<AF0>>, gpiob::PB7<Alternate<AF0>>>;

    // Thread mode owns RX_OUT and TX_IN, the USART1 interrupt owns RX_IN and TX_OUT.
    // All are set by `init` before the interrupt is unmasked.
    static mut RX_IN: Option<Producer<u8, RX_Q_SIZE>> = None;
    static mut RX_OUT: Option<Consumer<u8, RX_Q_SIZE>> = None;
    static mut TX_IN: Option<Producer<u8, TX_Q_SIZE>> = None;
    static mut TX_OUT: Option<Consumer<u8, TX_Q_SIZE>> = None;
    static mut PORT: Option<Port> = None;

    pub struct Uart1Tx;

    impl core::fmt::Write for Uart1Tx {
        fn write_str(&mut self, s: &str) -> Result<(), core::fmt::Error> {
            s.bytes().for_each(write_byte);
            Ok(())
        }
    }

    /// Must be called once during application initialization
    pub fn init(mut port: Port, irq_prio: u8) {
        static mut RX_Q: Queue<u8, RX_Q_SIZE> = Queue::new();
        static mut TX_Q: Queue<u8, TX_Q_SIZE> = Queue::new();

        port.listen(Event::Rxne);
        let mut nvic = unsafe { pac::CorePeripherals::steal() }.NVIC;

        unsafe {
            let (rx_in, rx_out) = RX_Q.split();
            let (tx_in, tx_out) = TX_Q.split();
            RX_IN = Some(rx_in);
            RX_OUT = Some(rx_out);
            TX_IN = Some(tx_in);
            TX_OUT = Some(tx_out);
            PORT = Some(port);

            nvic.set_priority(pac::Interrupt::USART1, irq_prio);
            pac::NVIC::unmask(pac::Interrupt::USART1);
        }
    }

    /// Drain received bytes into `line`. Returns true once a full line is in it.
    pub fn read_line(line: &mut LineBuffer<LINE_LEN>) -> bool {
        let rx_out = unsafe { RX_OUT.as_mut().unwrap_unchecked() };
        while let Some(b) = rx_out.dequeue() {
            if line.push(b) {
                return true;
            }
        }
        false
    }

    /// Queue a byte for transmission, dropping it if the queue is full.
    /// Called from both thread and interrupt context.
    pub fn write_byte(b: u8) {
        cortex_m::interrupt::free(|_| {
            let tx_in = unsafe { TX_IN.as_mut().unwrap_unchecked() };
            tx_in.enqueue(b).ok();
            let port = unsafe { PORT.as_mut().unwrap_unchecked() };
            port.listen(Event::Txe);
        });
    }

    pub fn writer() -> Uart1Tx {
        Uart1Tx
    }

    #[interrupt]
    fn USART1() {
        let port = unsafe { PORT.as_mut().unwrap_unchecked() };
        let rx_in = unsafe { RX_IN.as_mut().unwrap_unchecked() };
        let tx_out = unsafe { TX_OUT.as_mut().unwrap_unchecked() };

        if let Ok(b) = port.read() {
            rx_in.enqueue(b).ok();
        }

        let usart1 = unsafe { pac::Peripherals::steal().USART1 };
        if usart1.isr.read().txe().bit_is_set() {
            match tx_out.dequeue() {
                Some(b) => {
                    port.write(b).ok();
                }
                // Masked until `write_byte` queues more
                None => port.unlisten(Event::Txe),
            }
        }
    }
}
