//! # Mode switching
//!
//! The module is switched between normal and configuration mode with M0/M1:
//! - `{0,0}`: Normal, UART at the configured speed
//! - `{1,1}`: Configuration, UART fixed at 9600 8N1
//!
//! Switching is always done in the same sequence: drive the pins, wait for the
//! settle delay (AUX is not meaningful before), then wait for AUX to go high.
//!
//! ## Available Methods
//! - [`init`](E32::init) - Put pins and UART in normal mode
//! - [`enter_config`](E32::enter_config) - Switch to configuration mode
//! - [`exit_config`](E32::exit_config) - Switch back to normal mode
//! - [`mode`](E32::mode) - Current operating mode

use embassy_time::{Duration, Timer};
use embedded_hal::digital::v2::OutputPin;

use crate::cmd::cmd_params::UartParity;
use crate::constants::CONFIG_BAUD;
use crate::status::OperatingMode;

use super::{AuxPin, E32, E32Error, Transport};

impl<'h, O, T, A> E32<'h, O, T, A> where
    O: OutputPin, T: Transport, A: AuxPin
{

    /// Put the module in normal mode and the UART at the normal mode speed.
    /// Called automatically by the first configuration transaction.
    pub async fn init(&mut self) -> Result<(), E32Error> {
        self.exit_config().await?;
        self.state.set_initialized();
        Ok(())
    }

    pub(crate) async fn ensure_init(&mut self) -> Result<(), E32Error> {
        if !self.state.initialized() {
            self.init().await?;
        }
        Ok(())
    }

    /// Current operating mode
    pub fn mode(&self) -> OperatingMode {
        self.state.mode()
    }

    /// Switch the module to configuration mode and the UART to 9600 8N1.
    /// On timeout the mode is left unchanged and the module state must be considered unknown.
    pub async fn enter_config(&mut self) -> Result<(), E32Error> {
        let prev = self.state.mode();
        self.state.set_mode(OperatingMode::Transitioning);
        let ready_timeout = self.timing.enter_ready;
        if let Err(err) = self.switch_mode(OperatingMode::Config, ready_timeout).await {
            self.state.set_mode(prev);
            let err = match err {
                E32Error::AuxTimeout => E32Error::EnterModeTimeout,
                e => e,
            };
            #[cfg(feature = "defmt")]{defmt::warn!("Enter config mode failed: {}", err);}
            self.state.set_error(err.as_str());
            return Err(err);
        }
        // Pins are in configuration mode even if the UART cannot follow
        self.state.set_mode(OperatingMode::Config);
        self.uart.set_speed(CONFIG_BAUD, UartParity::N8_1)?;
        self.uart.clear_rx();
        #[cfg(feature = "defmt")]{defmt::debug!("Config mode");}
        Ok(())
    }

    /// Switch the module back to normal mode and restore the UART speed.
    /// A timeout on AUX is only logged: normal mode is the idle state of the module.
    pub async fn exit_config(&mut self) -> Result<(), E32Error> {
        let prev = self.state.mode();
        self.state.set_mode(OperatingMode::Transitioning);
        let ready_timeout = self.timing.exit_ready;
        match self.switch_mode(OperatingMode::Normal, ready_timeout).await {
            Ok(()) => {}
            Err(E32Error::AuxTimeout) => {
                #[cfg(feature = "defmt")]{defmt::warn!("{}", E32Error::ExitModeTimeout);}
            }
            Err(err) => {
                self.state.set_mode(prev);
                return Err(err);
            }
        }
        // Pins are in normal mode even if the UART cannot follow
        self.state.set_mode(OperatingMode::Normal);
        let (baud, parity) = (self.state.uart_baud(), self.state.uart_parity());
        self.uart.set_speed(baud.bps(), parity)?;
        self.uart.clear_rx();
        #[cfg(feature = "defmt")]{defmt::debug!("Normal mode ({} bps)", baud.bps());}
        Ok(())
    }

    /// Drive M0/M1, let the level settle then wait for AUX
    async fn switch_mode(&mut self, mode: OperatingMode, ready_timeout: Duration) -> Result<(), E32Error> {
        self.set_mode_pins(mode)?;
        Timer::after(self.timing.mode_settle).await;
        self.wait_ready(ready_timeout).await
    }

    fn set_mode_pins(&mut self, mode: OperatingMode) -> Result<(), E32Error> {
        match mode {
            OperatingMode::Normal => {
                self.m0.set_low().map_err(|_| E32Error::Pin)?;
                self.m1.set_low().map_err(|_| E32Error::Pin)
            }
            OperatingMode::Config => {
                self.m0.set_high().map_err(|_| E32Error::Pin)?;
                self.m1.set_high().map_err(|_| E32Error::Pin)
            }
            OperatingMode::Transitioning => Ok(()),
        }
    }

}
