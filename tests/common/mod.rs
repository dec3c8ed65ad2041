// Mock pins and UART emulating the module behaviour
#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embassy_time::{Duration, Timer};
use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal_1::digital::ErrorType;
use embedded_hal_async::digital::Wait;

use e32_uart::{AuxBlocking, E32, E32Error, Timing, Transport, UartParity};

/// Digital pin shared between the driver and the test
#[derive(Clone, Default)]
pub struct MockPin(pub Rc<Cell<bool>>);

impl MockPin {
    pub fn new(level: bool) -> Self {
        Self(Rc::new(Cell::new(level)))
    }

    pub fn level(&self) -> bool {
        self.0.get()
    }
}

impl OutputPin for MockPin {
    type Error = Infallible;

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
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(self.0.get())
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        Ok(!self.0.get())
    }
}

/// AUX pin waited on through edges instead of polling by the driver
#[derive(Clone, Default)]
pub struct EdgePin(pub MockPin);

impl EdgePin {
    async fn wait_level(&self, level: bool) -> Result<(), Infallible> {
        while self.0.level() != level {
            Timer::after(Duration::from_millis(1)).await;
        }
        Ok(())
    }
}

impl InputPin for EdgePin {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        self.0.is_high()
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        self.0.is_low()
    }
}

impl ErrorType for EdgePin {
    type Error = Infallible;
}

impl Wait for EdgePin {
    async fn wait_for_high(&mut self) -> Result<(), Infallible> {
        self.wait_level(true).await
    }

    async fn wait_for_low(&mut self) -> Result<(), Infallible> {
        self.wait_level(false).await
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Infallible> {
        self.wait_level(false).await?;
        self.wait_level(true).await
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Infallible> {
        self.wait_level(true).await?;
        self.wait_level(false).await
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Infallible> {
        let start = self.0.level();
        self.wait_level(!start).await
    }
}

/// UART connected to an emulated module
#[derive(Default)]
pub struct MockUart {
    /// Every write, in order
    pub writes: Vec<Vec<u8>>,
    /// Every speed change, in order
    pub speeds: Vec<(u32, UartParity)>,
    /// Bytes waiting to be read by the driver
    pub rx: VecDeque<u8>,
    /// Parameter frame stored by the emulated module
    pub stored: Option<[u8; 6]>,
    /// Echo each write-parameters frame
    pub echo_writes: bool,
    /// Answer the read-parameters request with the stored frame
    pub answer_reads: bool,
    /// Answer the read-parameters request with these bytes instead
    pub read_override: Option<Vec<u8>>,
    /// Answer the read-version request with these bytes
    pub version: Option<Vec<u8>>,
    /// Refuse speed changes
    pub fail_speed: bool,
}

impl MockUart {
    /// Module echoing writes and answering reads
    pub fn module() -> Self {
        Self { echo_writes: true, answer_reads: true, ..Default::default() }
    }

    /// Module that never answers
    pub fn silent() -> Self {
        Self::default()
    }

    /// All bytes written, concatenated
    pub fn tx(&self) -> Vec<u8> {
        self.writes.concat()
    }

    /// Queue bytes as if received over the air
    pub fn receive(&mut self, data: &[u8]) {
        self.rx.extend(data.iter().copied());
    }
}

impl Transport for MockUart {
    fn set_speed(&mut self, baud: u32, parity: UartParity) -> Result<(), E32Error> {
        if self.fail_speed {
            return Err(E32Error::Transport);
        }
        self.speeds.push((baud, parity));
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), E32Error> {
        self.writes.push(data.to_vec());
        if data.len() == 6 && data[0] == 0xC0 {
            let mut frame = [0u8; 6];
            frame.copy_from_slice(data);
            self.stored = Some(frame);
            if self.echo_writes {
                self.rx.extend(frame);
            }
        } else if data == [0xC1, 0xC1, 0xC1] && self.answer_reads {
            if let Some(rsp) = &self.read_override {
                self.rx.extend(rsp.iter().copied());
            } else if let Some(frame) = self.stored {
                self.rx.extend(frame);
            }
        } else if data == [0xC3, 0xC3, 0xC3] {
            if let Some(rsp) = &self.version {
                self.rx.extend(rsp.iter().copied());
            }
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, E32Error> {
        let n = buf.len().min(self.rx.len());
        for (dst, src) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn clear_rx(&mut self) {
        self.rx.clear();
    }
}

/// Shortened delays so that timeouts are reached quickly
pub fn fast_timing() -> Timing {
    Timing {
        mode_settle: Duration::from_millis(1),
        enter_ready: Duration::from_millis(40),
        exit_ready: Duration::from_millis(20),
        write_ready: Duration::from_millis(20),
        response: Duration::from_millis(30),
        read_poll: Duration::from_millis(1),
    }
}

pub type TestRadio<'h, 'u> = E32<'h, MockPin, &'u mut MockUart, AuxBlocking<MockPin>>;

/// Mode pins and AUX pin handles kept by the test
pub struct Pins {
    pub m0: MockPin,
    pub m1: MockPin,
    pub aux: MockPin,
}

/// Driver on a mock UART with AUX initially at the given level
pub fn radio<'h, 'u>(uart: &'u mut MockUart, aux_ready: bool) -> (TestRadio<'h, 'u>, Pins) {
    let pins = Pins {
        m0: MockPin::new(false),
        m1: MockPin::new(false),
        aux: MockPin::new(aux_ready),
    };
    let radio = E32::new_blocking(pins.m0.clone(), pins.m1.clone(), pins.aux.clone(), uart)
        .with_timing(fast_timing());
    (radio, pins)
}
