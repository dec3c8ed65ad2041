#![no_std]

//! # Driver for Ebyte E32 style UART LoRa transceivers
//!
//! The module is controlled by two mode pins (M0/M1), reports when it is idle on the AUX pin
//! and exchanges both configuration frames and user data over a single UART.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use e32_uart::{E32, RadioConfig, TransmissionMode};
//!
//! let mut radio = E32::new_blocking(m0, m1, aux, uart);
//! radio.init().await.expect("Init");
//!
//! let mut cfg = RadioConfig::new(0x0102, 0x17);
//! cfg.tx_mode = TransmissionMode::Fixed;
//! radio.apply_config(&cfg).await.expect("Applying configuration");
//!
//! radio.send_str("hello").await.expect("Sending");
//! ```
//!
//! ## Modules
//! - [`mode`] - Normal/Configuration mode switching
//! - [`session`] - Write/read/verify of the parameter frame, version and reset
//! - [`messenger`] - Line oriented messaging in normal mode
//! - [`cmd`] - Pure encoding/decoding of the frames

pub mod constants;
pub mod status;
pub mod cmd;
pub mod mode;
pub mod session;
pub mod messenger;

use core::marker::PhantomData;

use embassy_time::{with_timeout, Duration, Instant, Timer};
use embedded_hal::digital::v2::{OutputPin, InputPin};
use embedded_hal_async::digital::Wait;

use constants::*;
use messenger::LineAssembler;
use status::SessionState;

pub use cmd::cmd_params::{
    AirDataRate, FieldOrder, FrameError, FrameLayout, Params, RadioConfig, TransmissionMode,
    TxPower, UartBaudRate, UartParity,
};
pub use cmd::cmd_system::VersionRsp;
pub use status::OperatingMode;

trait Sealed{}
#[allow(private_bounds)]
/// Sealed trait to implement two flavor of the driver where
/// the AUX pin can be either a simple input or one implementing the Wait trait
pub trait AuxPin: Sealed {
    type Pin: InputPin;

    #[allow(async_fn_in_trait)]
    async fn wait_ready(pin: &mut Self::Pin, timeout: Duration) -> Result<(), E32Error>;
}
pub struct AuxBlocking<I> {
    _marker: PhantomData<I>
}
pub struct AuxAsync<I> {
    _marker: PhantomData<I>
}
impl<I> Sealed for AuxBlocking<I> {}
impl<I> Sealed for AuxAsync<I> {}

impl<I: InputPin> AuxPin for AuxBlocking<I> {
    type Pin = I;

    /// Poll AUX pin until it goes high
    async fn wait_ready(pin: &mut I, timeout: Duration) -> Result<(), E32Error> {
        let start = Instant::now();
        while pin.is_low().map_err(|_| E32Error::Pin)? {
            if start.elapsed() >= timeout {
                return Err(E32Error::AuxTimeout);
            }
            Timer::after(AUX_POLL_INTERVAL).await;
        }
        Ok(())
    }
}

impl<I: InputPin + Wait> AuxPin for AuxAsync<I> {
    type Pin = I;

    /// Wait for an edge on the AUX pin to go high (if not already)
    async fn wait_ready(pin: &mut I, timeout: Duration) -> Result<(), E32Error> {
        if pin.is_low().map_err(|_| E32Error::Pin)? {
            match with_timeout(timeout, pin.wait_for_high()).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(_)) => Err(E32Error::Pin),
                Err(_) => Err(E32Error::AuxTimeout),
            }
        } else {
            Ok(())
        }
    }
}

/// Byte stream to the module UART
///
/// The driver runs its own timeout loop on top of `read`, which must never block.
pub trait Transport {
    /// Reconfigure the UART speed (always 8 data bits, 1 stop bit)
    fn set_speed(&mut self, baud: u32, parity: UartParity) -> Result<(), E32Error>;

    /// Send all bytes
    #[allow(async_fn_in_trait)]
    async fn write(&mut self, data: &[u8]) -> Result<(), E32Error>;

    /// Copy the bytes already received (up to `buf.len()`) and return how many were copied
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, E32Error>;

    /// Drop any pending received byte
    fn clear_rx(&mut self);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn set_speed(&mut self, baud: u32, parity: UartParity) -> Result<(), E32Error> {
        T::set_speed(self, baud, parity)
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), E32Error> {
        T::write(self, data).await
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, E32Error> {
        T::read(self, buf)
    }

    fn clear_rx(&mut self) {
        T::clear_rx(self)
    }
}

/// Delays and timeouts used by the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Delay after driving M0/M1 before AUX is sampled
    pub mode_settle: Duration,
    /// Budget for AUX to go high when entering configuration mode
    pub enter_ready: Duration,
    /// Budget for AUX to go high when returning to normal mode
    pub exit_ready: Duration,
    /// Budget for AUX to go high after a command
    pub write_ready: Duration,
    /// Budget to collect a complete response
    pub response: Duration,
    /// Sleep between two empty reads
    pub read_poll: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            mode_settle: MODE_SETTLE,
            enter_ready: ENTER_READY_TIMEOUT,
            exit_ready: EXIT_READY_TIMEOUT,
            write_ready: WRITE_READY_TIMEOUT,
            response: RESPONSE_TIMEOUT,
            read_poll: READ_POLL_INTERVAL,
        }
    }
}

/// E32 Device
pub struct E32<'h, O, T, A: AuxPin> {
    /// Mode select pin M0
    m0: O,
    /// Mode select pin M1
    m1: O,
    /// AUX pin: high when the module is idle
    aux: A::Pin,
    /// UART to the module
    uart: T,
    /// Frame variant spoken by the module
    layout: FrameLayout,
    /// Delays and timeouts
    timing: Timing,
    /// Mode, cached parameters and outcome of the last transaction
    state: SessionState,
    /// Messaging: transmission mode used to build outgoing messages
    tx_mode: TransmissionMode,
    /// Messaging: append/split on line terminator
    line_framing: bool,
    /// Messaging: incoming line being assembled
    rx: LineAssembler,
    /// Messaging: handler called for each received line
    on_line: Option<&'h mut dyn FnMut(&str)>,
}

/// Error using the E32
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum E32Error {
    /// Unable to Set/Get a pin level
    Pin,
    /// Unable to use the UART
    Transport,
    /// Timeout while waiting for AUX
    AuxTimeout,
    /// AUX did not go high after switching to configuration mode
    EnterModeTimeout,
    /// AUX did not go high after switching back to normal mode
    ExitModeTimeout,
    /// AUX did not go high after a write command
    WriteTimeout,
    /// Response shorter than expected
    ShortResponse,
    /// Response does not start with an accepted header
    UnexpectedHeader,
    /// Written parameters could not be confirmed
    VerificationFailed,
    /// Nothing received before timeout
    NoBytesReceived,
    /// AUX did not go high after a reset
    ResetTimeout,
    /// Operation not allowed in current mode
    WrongMode,
}

impl E32Error {
    /// Human readable description, stored as last error
    pub fn as_str(&self) -> &'static str {
        match self {
            E32Error::Pin => "Pin access failed",
            E32Error::Transport => "UART access failed",
            E32Error::AuxTimeout => "Timeout waiting for AUX",
            E32Error::EnterModeTimeout => "Timeout entering config mode",
            E32Error::ExitModeTimeout => "Timeout returning to normal mode",
            E32Error::WriteTimeout => "Timeout waiting for AUX after write",
            E32Error::ShortResponse => "Response too short",
            E32Error::UnexpectedHeader => "Unexpected response header",
            E32Error::VerificationFailed => "Parameter verification failed",
            E32Error::NoBytesReceived => "No response received",
            E32Error::ResetTimeout => "Timeout waiting for module reset",
            E32Error::WrongMode => "Operation not allowed in current mode",
        }
    }
}

impl From<FrameError> for E32Error {
    fn from(value: FrameError) -> Self {
        match value {
            FrameError::ShortResponse => E32Error::ShortResponse,
            FrameError::UnexpectedHeader(_) => E32Error::UnexpectedHeader,
        }
    }
}

impl core::fmt::Display for E32Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Create driver with AUX pin not implementing wait
impl<'h, I, O, T> E32<'h, O, T, AuxBlocking<I>> where
    I: InputPin, O: OutputPin, T: Transport
{
    /// Create an E32 Device with polling on the AUX pin
    pub fn new_blocking(m0: O, m1: O, aux: I, uart: T) -> Self {
        Self::build(m0, m1, aux, uart)
    }
}

// Create driver with AUX pin implementing wait
impl<'h, I, O, T> E32<'h, O, T, AuxAsync<I>> where
    I: InputPin + Wait, O: OutputPin, T: Transport
{
    /// Create an E32 Device with async AUX pin
    pub fn new(m0: O, m1: O, aux: I, uart: T) -> Self {
        Self::build(m0, m1, aux, uart)
    }
}

impl<'h, O, T, A> E32<'h, O, T, A> where
    O: OutputPin, T: Transport, A: AuxPin
{
    fn build(m0: O, m1: O, aux: A::Pin, uart: T) -> Self {
        Self {
            m0,
            m1,
            aux,
            uart,
            layout: FrameLayout::DEFAULT,
            timing: Timing::default(),
            state: SessionState::new(),
            tx_mode: TransmissionMode::Transparent,
            line_framing: true,
            rx: LineAssembler::new(),
            on_line: None,
        }
    }

    /// Select the frame variant spoken by the module
    pub fn with_layout(mut self, layout: FrameLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Override delays and timeouts
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Frame variant in use
    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Delays and timeouts in use
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Mode, cached parameters and outcome of the last transaction
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Access the UART, e.g. to route it to another peripheral while the module is idle
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.uart
    }

    /// Give back pins and UART
    pub fn release(self) -> (O, O, A::Pin, T) {
        (self.m0, self.m1, self.aux, self.uart)
    }

    /// Check if the AUX pin is high, i.e. module idle
    pub fn aux_is_high(&self) -> bool {
        self.aux.is_high().unwrap_or(false)
    }

    /// Wait for the module to be idle, i.e. AUX pin high
    pub async fn wait_ready(&mut self, timeout: Duration) -> Result<(), E32Error> {
        A::wait_ready(&mut self.aux, timeout).await
    }

    /// Send a raw command
    pub async fn cmd_wr(&mut self, req: &[u8]) -> Result<(), E32Error> {
        #[cfg(feature = "defmt")]{defmt::trace!("[CMD WR] {:02x}", req);}
        self.uart.write(req).await
    }

    /// Accumulate received bytes until `buf` is full or `timeout` elapsed.
    /// Return the number of bytes received.
    pub async fn read_exact_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, E32Error> {
        let start = Instant::now();
        let mut len = 0;
        while len < buf.len() {
            let n = self.uart.read(&mut buf[len..])?;
            len += n;
            if len >= buf.len() || start.elapsed() >= timeout {
                break;
            }
            if n == 0 {
                Timer::after(self.timing.read_poll).await;
            }
        }
        Ok(len)
    }

}
