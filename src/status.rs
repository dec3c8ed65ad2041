//! # Session state
//!
//! Everything the driver believes about the module:
//! - The current operating mode (Normal/Config, or in between while switching)
//! - The last parameter block confirmed by the module
//! - The outcome of the last transaction (`config_ok` and `last_error`)
//! - The UART speed to restore when going back to normal mode
//!
//! The state is only modified by the mode and session operations of [`E32`](crate::E32).
//! `last_error` is cleared when a transaction starts and is never empty when a
//! transaction ended with `config_ok` false.

use crate::cmd::cmd_params::{Params, UartBaudRate, UartParity};
use crate::E32Error;

/// Operating mode as selected by M0/M1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    /// M0=0, M1=0: UART and radio open, messages can be exchanged
    Normal,
    /// Pins changed, waiting for AUX
    Transitioning,
    /// M0=1, M1=1: parameter commands accepted on UART at 9600 8N1
    Config,
}

/// Driver session
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionState {
    initialized: bool,
    mode: OperatingMode,
    cached: Option<Params>,
    config_ok: bool,
    last_error: &'static str,
    uart_baud: UartBaudRate,
    uart_parity: UartParity,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {

    /// Session at driver creation: not initialized, normal mode at 9600 8N1
    pub fn new() -> Self {
        Self {
            initialized: false,
            mode: OperatingMode::Normal,
            cached: None,
            config_ok: false,
            last_error: "",
            uart_baud: UartBaudRate::Bps9600,
            uart_parity: UartParity::N8_1,
        }
    }

    /// True once the pins and UART were put in a known state
    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// Current operating mode
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Last parameter block confirmed by the module
    pub fn cached(&self) -> Option<&Params> {
        self.cached.as_ref()
    }

    /// True if the last transaction succeeded
    pub fn config_ok(&self) -> bool {
        self.config_ok
    }

    /// Description of the last failure, or advisory message on a degraded success.
    /// Empty when the last transaction fully succeeded.
    pub fn last_error(&self) -> &'static str {
        self.last_error
    }

    /// UART baudrate used in normal mode
    pub fn uart_baud(&self) -> UartBaudRate {
        self.uart_baud
    }

    /// UART parity used in normal mode
    pub fn uart_parity(&self) -> UartParity {
        self.uart_parity
    }

    pub(crate) fn set_initialized(&mut self) {
        self.initialized = true;
    }

    pub(crate) fn set_mode(&mut self, mode: OperatingMode) {
        self.mode = mode;
    }

    pub(crate) fn set_uart(&mut self, baud: UartBaudRate, parity: UartParity) {
        self.uart_baud = baud;
        self.uart_parity = parity;
    }

    /// Start of a configuration transaction
    pub(crate) fn begin(&mut self) {
        self.last_error = "";
        self.config_ok = false;
    }

    /// Record an error without touching the configuration status
    pub(crate) fn set_error(&mut self, msg: &'static str) {
        self.last_error = msg;
    }

    pub(crate) fn clear_error(&mut self) {
        self.last_error = "";
    }

    /// End of a failed transaction: cached parameters are kept
    pub(crate) fn fail(&mut self, err: E32Error) -> E32Error {
        self.fail_with(err, err.as_str())
    }

    /// End of a failed transaction with a specific message
    pub(crate) fn fail_with(&mut self, err: E32Error, msg: &'static str) -> E32Error {
        self.config_ok = false;
        self.last_error = if msg.is_empty() { err.as_str() } else { msg };
        err
    }

    /// End of a successful transaction. The advisory message is empty unless the
    /// parameters could only be confirmed partially.
    pub(crate) fn succeed(&mut self, params: Params, advisory: &'static str) {
        self.cached = Some(params);
        self.config_ok = true;
        self.last_error = advisory;
    }
}
