//! # Configuration transactions
//!
//! Each transaction is bracketed by [`enter_config`](E32::enter_config) and
//! [`exit_config`](E32::exit_config): whatever happens in between, the pins are
//! driven back to normal mode before returning.
//!
//! ## Available Methods
//! - [`apply_config`](E32::apply_config) - Write parameters and confirm them by reading them back
//! - [`read_config`](E32::read_config) - Read the parameters stored in the module
//! - [`read_version`](E32::read_version) - Read model and firmware version
//! - [`reset_module`](E32::reset_module) - Restart the module
//! - [`config_ok`](E32::config_ok) / [`last_error`](E32::last_error) - Outcome of the last transaction
//! - [`cached_params`](E32::cached_params), [`cached_config`](E32::cached_config),
//!   [`cached_addr_high`](E32::cached_addr_high), [`cached_addr_low`](E32::cached_addr_low),
//!   [`cached_channel`](E32::cached_channel) - Last parameters confirmed by the module
//!
//! ## Verification
//! After a write, the module may echo the frame and is then asked for its parameters.
//! Up to 6 bytes are collected from that single read, echo first.
//! - A frame with a valid header is a full success and becomes the cached parameters,
//!   even if the module changed some fields.
//! - Otherwise, bytes starting with 0xC0/0xC2 are accepted as a degraded success (some
//!   firmware do not answer a read right after a write): `config_ok` is true, the written
//!   parameters are cached and `last_error` holds an advisory message.
//! - Anything else fails with [`VerificationFailed`](E32Error::VerificationFailed) and the
//!   cached parameters are kept.

use embassy_time::Timer;
use embedded_hal::digital::v2::OutputPin;

use crate::cmd::cmd_params::{read_params_req, FrameError, Params, RadioConfig};
use crate::cmd::cmd_system::{read_version_req, reset_cmd, VersionRsp};
use crate::constants::*;

use super::{AuxPin, E32, E32Error, Transport};

/// Advisory message of a write confirmed only by its echo
pub const MSG_ECHO_ACCEPTED : &str = "no verified readback; echo accepted";
const MSG_NO_READBACK : &str = "Verification failed: no read-back and no echo";
const MSG_SHORT_READBACK : &str = "Verification failed: read-back too short";
const MSG_BAD_HEADER : &str = "Verification failed: unexpected read-back header";

impl<'h, O, T, A> E32<'h, O, T, A> where
    O: OutputPin, T: Transport, A: AuxPin
{

    /// Write a configuration to the module and confirm it by reading it back.
    /// On success the normal mode UART speed follows the new configuration.
    #[doc(alias = "session")]
    pub async fn apply_config(&mut self, cfg: &RadioConfig) -> Result<(), E32Error> {
        if let Err(err) = self.ensure_init().await {
            return Err(self.state.fail(err));
        }
        self.state.begin();
        let params = self.layout.encode(cfg);
        let req = self.layout.params_frame(&params);

        self.enter_session().await?;
        if let Err(err) = self.cmd_wr(&req).await {
            return self.abort(err).await;
        }
        if self.wait_ready(self.timing.write_ready).await.is_err() {
            return self.abort(E32Error::WriteTimeout).await;
        }

        // The echo of the write (if any) and the read-back share the same read
        let mut rsp = [0u8; PARAM_FRAME_LEN];
        let rsp_len = match self.request_params(&mut rsp).await {
            Ok(n) => n,
            Err(err) => return self.abort(err).await,
        };
        self.leave_session().await;

        match self.layout.parse_response(&rsp[..rsp_len]) {
            Ok(read) => {
                #[cfg(feature = "defmt")]{
                    if read != params {
                        defmt::warn!("Module reports {} instead of {}", read, params);
                    }
                }
                self.adopt(cfg, read, "")
            }
            Err(_) if rsp_len > 0 && (rsp[0] == HEAD_WRITE || rsp[0] == HEAD_ALT_ACK) => {
                #[cfg(feature = "defmt")]{defmt::warn!("No read-back, accepting echo {:02x}", &rsp[..rsp_len]);}
                self.adopt(cfg, params, MSG_ECHO_ACCEPTED)
            }
            Err(err) => {
                let msg = match err {
                    _ if rsp_len == 0 => MSG_NO_READBACK,
                    FrameError::ShortResponse => MSG_SHORT_READBACK,
                    FrameError::UnexpectedHeader(_) => MSG_BAD_HEADER,
                };
                #[cfg(feature = "defmt")]{defmt::warn!("{}", msg);}
                Err(self.state.fail_with(E32Error::VerificationFailed, msg))
            }
        }
    }

    /// Read the parameters stored in the module and cache them
    #[doc(alias = "session")]
    pub async fn read_config(&mut self) -> Result<Params, E32Error> {
        if let Err(err) = self.ensure_init().await {
            return Err(self.state.fail(err));
        }
        self.state.begin();
        self.enter_session().await?;

        let mut rsp = [0u8; PARAM_FRAME_LEN];
        let rsp_len = match self.request_params(&mut rsp).await {
            Ok(n) => n,
            Err(err) => return self.abort(err).await,
        };
        self.leave_session().await;

        if rsp_len == 0 {
            return Err(self.state.fail(E32Error::NoBytesReceived));
        }
        match self.layout.parse_response(&rsp[..rsp_len]) {
            Ok(params) => {
                self.state.succeed(params, "");
                Ok(params)
            }
            Err(err) => Err(self.state.fail(err.into())),
        }
    }

    /// Read model, firmware version and features.
    /// Does not change the configuration status nor the cached parameters.
    #[doc(alias = "session")]
    pub async fn read_version(&mut self) -> Result<VersionRsp, E32Error> {
        self.ensure_init().await?;
        self.state.clear_error();
        self.enter_bracket().await?;
        let res = self.request_version().await;
        self.leave_session().await;
        res.inspect_err(|err| self.state.set_error(err.as_str()))
    }

    /// Restart the module and wait for it to be idle again
    #[doc(alias = "session")]
    pub async fn reset_module(&mut self) -> Result<(), E32Error> {
        self.ensure_init().await?;
        self.state.clear_error();
        self.enter_bracket().await?;
        let res = self.request_reset().await;
        self.leave_session().await;
        res.inspect_err(|err| self.state.set_error(err.as_str()))
    }

    /// True if the last configuration transaction succeeded
    pub fn config_ok(&self) -> bool {
        self.state.config_ok()
    }

    /// Error (or advisory) message of the last transaction, empty on full success
    pub fn last_error(&self) -> &'static str {
        self.state.last_error()
    }

    /// Last parameters confirmed by the module
    pub fn cached_params(&self) -> Option<&Params> {
        self.state.cached()
    }

    /// Last parameters confirmed by the module, decoded
    pub fn cached_config(&self) -> Option<RadioConfig> {
        self.state.cached().map(|p| RadioConfig::from_params(p, &self.layout))
    }

    /// Cached address high byte (0 when nothing was confirmed yet)
    pub fn cached_addr_high(&self) -> u8 {
        self.state.cached().map_or(0, |p| p.addr_h())
    }

    /// Cached address low byte (0 when nothing was confirmed yet)
    pub fn cached_addr_low(&self) -> u8 {
        self.state.cached().map_or(0, |p| p.addr_l())
    }

    /// Cached channel (0 when nothing was confirmed yet)
    pub fn cached_channel(&self) -> u8 {
        self.state.cached().map_or(0, |p| p.channel())
    }

    /// Enter configuration mode for a transaction, returning to normal mode on failure
    async fn enter_session(&mut self) -> Result<(), E32Error> {
        if let Err(err) = self.enter_config().await {
            self.leave_session().await;
            return Err(self.state.fail(err));
        }
        Ok(())
    }

    /// Enter configuration mode for a command not affecting the configuration status
    async fn enter_bracket(&mut self) -> Result<(), E32Error> {
        if let Err(err) = self.enter_config().await {
            self.leave_session().await;
            self.state.set_error(err.as_str());
            return Err(err);
        }
        Ok(())
    }

    /// Return to normal mode, keeping the transaction outcome
    async fn leave_session(&mut self) {
        if let Err(_err) = self.exit_config().await {
            #[cfg(feature = "defmt")]{defmt::error!("Unable to return to normal mode: {}", _err);}
        }
    }

    /// Abort a transaction after entering configuration mode
    async fn abort<R>(&mut self, err: E32Error) -> Result<R, E32Error> {
        self.leave_session().await;
        Err(self.state.fail(err))
    }

    /// Cache confirmed parameters and move the normal mode UART to the new speed
    fn adopt(&mut self, cfg: &RadioConfig, params: Params, advisory: &'static str) -> Result<(), E32Error> {
        self.state.set_uart(cfg.uart_baud, cfg.parity);
        self.tx_mode = cfg.tx_mode;
        if let Err(err) = self.uart.set_speed(cfg.uart_baud.bps(), cfg.parity) {
            return Err(self.state.fail(err));
        }
        self.state.succeed(params, advisory);
        Ok(())
    }

    /// Send the read-parameters request and collect up to 6 bytes
    async fn request_params(&mut self, rsp: &mut [u8; PARAM_FRAME_LEN]) -> Result<usize, E32Error> {
        self.cmd_wr(&read_params_req()).await?;
        // The response read has its own timeout: a busy AUX is not an error here
        self.wait_ready(self.timing.write_ready).await.ok();
        self.read_exact_timeout(rsp, self.timing.response).await
    }

    async fn request_version(&mut self) -> Result<VersionRsp, E32Error> {
        self.cmd_wr(&read_version_req()).await?;
        self.wait_ready(self.timing.write_ready).await.ok();
        let mut rsp = [0u8; VERSION_RSP_LEN];
        let len = self.read_exact_timeout(&mut rsp, self.timing.response).await?;
        if len == 0 {
            return Err(E32Error::NoBytesReceived);
        }
        Ok(VersionRsp::from_slice(&rsp[..len])?)
    }

    async fn request_reset(&mut self) -> Result<(), E32Error> {
        self.cmd_wr(&reset_cmd()).await?;
        Timer::after(self.timing.mode_settle).await;
        self.wait_ready(self.timing.enter_ready).await
            .map_err(|_| E32Error::ResetTimeout)
    }

}
