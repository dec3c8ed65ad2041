//! # Messaging in normal mode
//!
//! Once the module is in normal mode, everything written to the UART is sent over the air.
//! In fixed transmission mode each message starts with the 3 bytes `ADDH, ADDL, CHAN` of the
//! destination. With line framing enabled, each message ends with a `\n` and the
//! received bytes are split on `\n` before being handed to the receive handler.
//!
//! ## Available Methods
//! - [`set_tx_mode`](E32::set_tx_mode) - Transparent or fixed transmission
//! - [`use_line_framing`](E32::use_line_framing) - Enable/disable line terminator handling
//! - [`send_str`](E32::send_str) - Send a message (destination from cached parameters in fixed mode)
//! - [`send_fixed`](E32::send_fixed) - Send a message to an explicit address/channel
//! - [`on_receive`](E32::on_receive) - Register the receive handler (replaces the previous one)
//! - [`poll_rx`](E32::poll_rx) - Read pending bytes and call the handler for each complete line

use embedded_hal::digital::v2::OutputPin;

use crate::cmd::cmd_params::TransmissionMode;
use crate::constants::*;
use crate::status::OperatingMode;

use super::{AuxPin, E32, E32Error, Transport};

/// Buffer for the line being received
pub struct LineAssembler {
    buf: [u8; RX_LINE_MAX],
    len: usize,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl LineAssembler {
    pub fn new() -> Self {
        Self { buf: [0; RX_LINE_MAX], len: 0 }
    }

    /// Append a byte, returning false if the buffer is full
    pub fn push(&mut self, byte: u8) -> bool {
        if self.len >= RX_LINE_MAX {
            return false;
        }
        self.buf[self.len] = byte;
        self.len += 1;
        true
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len >= RX_LINE_MAX
    }

    /// Bytes received so far
    pub fn data(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Length of the received bytes without a trailing incomplete UTF-8 sequence
    pub fn char_boundary(&self) -> usize {
        match core::str::from_utf8(self.data()) {
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            _ => self.len,
        }
    }

    /// Drop the first `n` bytes, keeping the rest at the start of the buffer
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.len);
        self.buf.copy_within(n..self.len, 0);
        self.len -= n;
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl<'h, O, T, A> E32<'h, O, T, A> where
    O: OutputPin, T: Transport, A: AuxPin
{

    /// Select transparent or fixed transmission for outgoing messages
    #[doc(alias = "messenger")]
    pub fn set_tx_mode(&mut self, mode: TransmissionMode) {
        self.tx_mode = mode;
    }

    /// Transmission mode used for outgoing messages
    pub fn tx_mode(&self) -> TransmissionMode {
        self.tx_mode
    }

    /// Enable/Disable line terminator on send and line splitting on receive
    #[doc(alias = "messenger")]
    pub fn use_line_framing(&mut self, en: bool) {
        self.line_framing = en;
        self.rx.clear();
    }

    /// Destination header used by `send_str` in fixed mode:
    /// cached parameters if any, default address/channel otherwise
    pub fn fixed_header(&self) -> [u8; 3] {
        match self.state.cached() {
            Some(p) => [p.addr_h(), p.addr_l(), p.channel()],
            None => [DEFAULT_ADDR_H, DEFAULT_ADDR_L, DEFAULT_CHANNEL],
        }
    }

    /// Send a message. In fixed mode it is prefixed by the cached address and channel.
    #[doc(alias = "messenger")]
    pub async fn send_str(&mut self, text: &str) -> Result<(), E32Error> {
        self.check_normal()?;
        if self.tx_mode == TransmissionMode::Fixed {
            let header = self.fixed_header();
            self.uart.write(&header).await?;
        }
        self.send_body(text).await
    }

    /// Send a message to a given address and channel, whatever the cached parameters
    #[doc(alias = "messenger")]
    pub async fn send_fixed(&mut self, addr_h: u8, addr_l: u8, channel: u8, text: &str) -> Result<(), E32Error> {
        self.check_normal()?;
        self.uart.write(&[addr_h, addr_l, channel]).await?;
        self.send_body(text).await
    }

    /// Register the handler called for each received line.
    /// Only one handler is kept: registering again replaces it.
    #[doc(alias = "messenger")]
    pub fn on_receive(&mut self, handler: &'h mut dyn FnMut(&str)) {
        self.on_line = Some(handler);
    }

    /// Remove the receive handler
    pub fn clear_receive(&mut self) {
        self.on_line = None;
    }

    /// Drain the bytes received so far and call the handler for each complete line
    /// (without its terminator). Without line framing, all pending bytes form one chunk.
    /// Return the number of chunks delivered.
    #[doc(alias = "messenger")]
    pub fn poll_rx(&mut self) -> Result<usize, E32Error> {
        self.check_normal()?;
        let mut chunk = [0u8; 64];
        let mut delivered = 0;
        loop {
            let n = self.uart.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            for &byte in &chunk[..n] {
                if self.line_framing && byte == LINE_TERMINATOR {
                    delivered += self.deliver();
                    continue;
                }
                if self.rx.is_full() {
                    // Never split a character across two chunks
                    let len = self.rx.char_boundary();
                    delivered += self.deliver_upto(len);
                }
                self.rx.push(byte);
            }
        }
        if !self.line_framing && !self.rx.is_empty() {
            delivered += self.deliver();
        }
        Ok(delivered)
    }

    /// Hand the assembled line to the handler and reset the assembler
    fn deliver(&mut self) -> usize {
        let len = self.rx.data().len();
        self.deliver_upto(len)
    }

    /// Hand the first `len` assembled bytes to the handler, keeping the rest
    fn deliver_upto(&mut self, len: usize) -> usize {
        let delivered = match core::str::from_utf8(&self.rx.data()[..len]) {
            Ok(line) => match self.on_line.as_mut() {
                Some(handler) => {
                    handler(line);
                    1
                }
                None => 0,
            },
            Err(_) => {
                #[cfg(feature = "defmt")]{defmt::warn!("Dropping non UTF-8 line ({} bytes)", len);}
                0
            }
        };
        self.rx.consume(len);
        delivered
    }

    async fn send_body(&mut self, text: &str) -> Result<(), E32Error> {
        #[cfg(feature = "defmt")]{
            if text.len() > MAX_PAYLOAD {
                defmt::debug!("Message of {} bytes will be split by the module", text.len());
            }
        }
        self.uart.write(text.as_bytes()).await?;
        if self.line_framing {
            self.uart.write(&[LINE_TERMINATOR]).await?;
        }
        Ok(())
    }

    fn check_normal(&self) -> Result<(), E32Error> {
        match self.state.mode() {
            OperatingMode::Normal => Ok(()),
            _ => Err(E32Error::WrongMode),
        }
    }

}
