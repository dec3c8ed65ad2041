// Parameter frame API: SPED/OPTION bitfields, write command, read request and response

use crate::constants::*;

/// UART parity (data bits and stop bits are always 8/1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartParity {
    #[default]
    N8_1 = 0,
    O8_1 = 1,
    E8_1 = 2,
}

impl From<u8> for UartParity {
    /// Decode the 2 bits of parity: 0b11 is documented as an alias of 8N1
    fn from(value: u8) -> Self {
        match value & 0x3 {
            1 => UartParity::O8_1,
            2 => UartParity::E8_1,
            _ => UartParity::N8_1,
        }
    }
}

/// UART baudrate used in normal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartBaudRate {
    Bps1200   = 0,
    Bps2400   = 1,
    Bps4800   = 2,
    #[default]
    Bps9600   = 3,
    Bps19200  = 4,
    Bps38400  = 5,
    Bps57600  = 6,
    Bps115200 = 7,
}

impl From<u8> for UartBaudRate {
    fn from(value: u8) -> Self {
        match value & 0x7 {
            0 => UartBaudRate::Bps1200,
            1 => UartBaudRate::Bps2400,
            2 => UartBaudRate::Bps4800,
            3 => UartBaudRate::Bps9600,
            4 => UartBaudRate::Bps19200,
            5 => UartBaudRate::Bps38400,
            6 => UartBaudRate::Bps57600,
            _ => UartBaudRate::Bps115200,
        }
    }
}

impl UartBaudRate {
    /// Baudrate in bit/s
    pub fn bps(&self) -> u32 {
        match self {
            UartBaudRate::Bps1200   => 1200,
            UartBaudRate::Bps2400   => 2400,
            UartBaudRate::Bps4800   => 4800,
            UartBaudRate::Bps9600   => 9600,
            UartBaudRate::Bps19200  => 19200,
            UartBaudRate::Bps38400  => 38400,
            UartBaudRate::Bps57600  => 57600,
            UartBaudRate::Bps115200 => 115200,
        }
    }
}

/// Data rate over the air
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AirDataRate {
    Kbps0_3  = 0,
    Kbps1_2  = 1,
    #[default]
    Kbps2_4  = 2,
    Kbps4_8  = 3,
    Kbps9_6  = 4,
    Kbps19_2 = 5,
}

impl From<u8> for AirDataRate {
    /// Decode the 3 bits of air data rate: 0b110 and 0b111 are documented as 19.2kbps
    fn from(value: u8) -> Self {
        match value & 0x7 {
            0 => AirDataRate::Kbps0_3,
            1 => AirDataRate::Kbps1_2,
            2 => AirDataRate::Kbps2_4,
            3 => AirDataRate::Kbps4_8,
            4 => AirDataRate::Kbps9_6,
            _ => AirDataRate::Kbps19_2,
        }
    }
}

/// Transmit power (values of the 20dBm module family)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxPower {
    #[default]
    Dbm20 = 0,
    Dbm17 = 1,
    Dbm14 = 2,
    Dbm10 = 3,
}

impl From<u8> for TxPower {
    fn from(value: u8) -> Self {
        match value & 0x3 {
            0 => TxPower::Dbm20,
            1 => TxPower::Dbm17,
            2 => TxPower::Dbm14,
            _ => TxPower::Dbm10,
        }
    }
}

/// Transparent (broadcast on the channel) or Fixed (3 bytes address header on each message)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmissionMode {
    #[default]
    Transparent = 0,
    Fixed = 1,
}

/// Order of the channel and speed bytes inside a parameter frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldOrder {
    /// HEAD, ADDH, ADDL, CHAN, SPED, OPTION
    ChannelFirst,
    /// HEAD, ADDH, ADDL, SPED, CHAN, OPTION
    SpeedFirst,
}

/// Error decoding a response frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Less bytes than a complete frame
    ShortResponse,
    /// First byte is not an accepted header
    UnexpectedHeader(u8),
}

/// Pack parity, UART baudrate and air data rate in the SPED byte
///  - 7:6 UART parity
///  - 5:3 UART baudrate
///  - 2:0 Air data rate
///
/// Values are masked to their field width: out of range values are truncated, not rejected.
pub fn pack_speed_bits(parity: u8, uart_baud: u8, air_rate: u8) -> u8 {
    ((parity & 0x3) << 6) | ((uart_baud & 0x7) << 3) | (air_rate & 0x7)
}

/// Pack typed parity, UART baudrate and air data rate in the SPED byte
pub fn pack_speed_byte(parity: UartParity, uart_baud: UartBaudRate, air_rate: AirDataRate) -> u8 {
    pack_speed_bits(parity as u8, uart_baud as u8, air_rate as u8)
}

/// Extract parity, UART baudrate and air data rate from a SPED byte
pub fn unpack_speed_byte(sped: u8) -> (UartParity, UartBaudRate, AirDataRate) {
    ((sped >> 6).into(), (sped >> 3).into(), sped.into())
}

/// Pack power and transmission mode in the OPTION byte using the default layout
pub fn pack_option_byte(power: TxPower, mode: TransmissionMode) -> u8 {
    FrameLayout::DEFAULT.pack_option_byte(power, mode)
}

/// Extract power and transmission mode from an OPTION byte using the default layout
pub fn unpack_option_byte(option: u8) -> (TxPower, TransmissionMode) {
    FrameLayout::DEFAULT.unpack_option_byte(option)
}

/// Write-parameters command for a configuration using the default layout
pub fn write_params_cmd(cfg: &RadioConfig) -> [u8; PARAM_FRAME_LEN] {
    FrameLayout::DEFAULT.write_params_cmd(cfg)
}

/// Request the module to send back its current parameters
pub fn read_params_req() -> [u8; 3] {
    [OP_READ_PARAMS; 3]
}

/// Decode a parameter response using the default layout
pub fn parse_response(bytes: &[u8]) -> Result<Params, FrameError> {
    FrameLayout::DEFAULT.parse_response(bytes)
}

/// Description of the OPTION byte and of the frame variant spoken by a module.
///
/// The OPTION layout and the accepted response headers differ between firmware
/// revisions of this module family, so none of it is hard-coded in the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameLayout {
    /// Position of the 2-bit power field
    pub power_shift: u8,
    /// Bit set for fixed transmission
    pub fixed_bit: u8,
    /// Constant bits always set in the OPTION byte (IO drive, wake-up time, FEC, ...)
    pub option_base: u8,
    /// Position of the channel and speed bytes
    pub field_order: FieldOrder,
    /// Accept 0xC2 as a response header in addition to 0xC0
    pub accept_alt_ack: bool,
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FrameLayout {

    /// Power on bits 1:0, fixed mode on bit 2, channel before speed, 0xC0/0xC2 accepted
    pub const DEFAULT: FrameLayout = FrameLayout {
        power_shift: 0,
        fixed_bit: 2,
        option_base: 0,
        field_order: FieldOrder::ChannelFirst,
        accept_alt_ack: true,
    };

    /// Same as default but only 0xC0 is a valid response header
    pub const STRICT: FrameLayout = FrameLayout {
        accept_alt_ack: false,
        ..FrameLayout::DEFAULT
    };

    /// Vendor datasheet variant: fixed mode on bit 7, IO push-pull (bit 6) and FEC (bit 2) enabled,
    /// wake-up time 250ms, power on bits 1:0, speed before channel
    pub const DATASHEET: FrameLayout = FrameLayout {
        power_shift: 0,
        fixed_bit: 7,
        option_base: 0x44,
        field_order: FieldOrder::SpeedFirst,
        accept_alt_ack: true,
    };

    /// Pack raw power and fixed flag in the OPTION byte. Power is masked to 2 bits.
    pub fn pack_option_bits(&self, power: u8, fixed: bool) -> u8 {
        let mut option = self.option_base;
        option |= (power & 0x3).checked_shl(self.power_shift as u32).unwrap_or(0);
        if fixed {
            option |= 1u8.checked_shl(self.fixed_bit as u32).unwrap_or(0);
        }
        option
    }

    /// Pack power and transmission mode in the OPTION byte
    pub fn pack_option_byte(&self, power: TxPower, mode: TransmissionMode) -> u8 {
        self.pack_option_bits(power as u8, mode == TransmissionMode::Fixed)
    }

    /// Extract power and transmission mode from an OPTION byte
    pub fn unpack_option_byte(&self, option: u8) -> (TxPower, TransmissionMode) {
        let power = option.checked_shr(self.power_shift as u32).unwrap_or(0);
        let fixed_mask = 1u8.checked_shl(self.fixed_bit as u32).unwrap_or(0);
        let mode = if option & fixed_mask != 0 {
            TransmissionMode::Fixed
        } else {
            TransmissionMode::Transparent
        };
        (power.into(), mode)
    }

    /// Return true if the byte is an accepted response header
    pub fn is_valid_header(&self, head: u8) -> bool {
        head == HEAD_WRITE || (self.accept_alt_ack && head == HEAD_ALT_ACK)
    }

    /// Encode a configuration in its 5 bytes parameter block
    pub fn encode(&self, cfg: &RadioConfig) -> Params {
        Params::new(
            cfg.addr_h,
            cfg.addr_l,
            cfg.channel,
            pack_speed_byte(cfg.parity, cfg.uart_baud, cfg.air_rate),
            self.pack_option_byte(cfg.power, cfg.tx_mode),
        )
    }

    /// Frame a parameter block as a write command
    pub fn params_frame(&self, params: &Params) -> [u8; PARAM_FRAME_LEN] {
        let mut cmd = [0u8; PARAM_FRAME_LEN];
        cmd[0] = HEAD_WRITE;
        cmd[1] = params.addr_h();
        cmd[2] = params.addr_l();
        match self.field_order {
            FieldOrder::ChannelFirst => {
                cmd[3] = params.channel();
                cmd[4] = params.sped();
            }
            FieldOrder::SpeedFirst => {
                cmd[3] = params.sped();
                cmd[4] = params.channel();
            }
        }
        cmd[5] = params.option();
        cmd
    }

    /// Write-parameters command for a configuration
    pub fn write_params_cmd(&self, cfg: &RadioConfig) -> [u8; PARAM_FRAME_LEN] {
        self.params_frame(&self.encode(cfg))
    }

    /// Decode a parameter response: at least 6 bytes starting with an accepted header.
    /// Bytes after the sixth are ignored.
    pub fn parse_response(&self, bytes: &[u8]) -> Result<Params, FrameError> {
        if bytes.len() < PARAM_FRAME_LEN {
            return Err(FrameError::ShortResponse);
        }
        if !self.is_valid_header(bytes[0]) {
            return Err(FrameError::UnexpectedHeader(bytes[0]));
        }
        let (chan, sped) = match self.field_order {
            FieldOrder::ChannelFirst => (bytes[3], bytes[4]),
            FieldOrder::SpeedFirst => (bytes[4], bytes[3]),
        };
        Ok(Params::new(bytes[1], bytes[2], chan, sped, bytes[5]))
    }
}

/// Parameter block as stored by the module: ADDH, ADDL, CHAN, SPED, OPTION
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Params([u8; PARAM_LEN]);

impl Params {

    /// Create a parameter block from its five fields
    pub fn new(addr_h: u8, addr_l: u8, channel: u8, sped: u8, option: u8) -> Self {
        Self([addr_h, addr_l, channel, sped, option])
    }

    /// Address high byte
    pub fn addr_h(&self) -> u8 {
        self.0[0]
    }

    /// Address low byte
    pub fn addr_l(&self) -> u8 {
        self.0[1]
    }

    /// Module address on 16 bits
    pub fn addr(&self) -> u16 {
        u16::from_be_bytes([self.0[0], self.0[1]])
    }

    /// Channel (frequency = base + channel MHz)
    pub fn channel(&self) -> u8 {
        self.0[2]
    }

    /// Packed speed byte
    pub fn sped(&self) -> u8 {
        self.0[3]
    }

    /// Packed option byte
    pub fn option(&self) -> u8 {
        self.0[4]
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; PARAM_LEN] {
        &self.0
    }
}

/// Module configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioConfig {
    pub addr_h: u8,
    pub addr_l: u8,
    pub channel: u8,
    pub uart_baud: UartBaudRate,
    pub parity: UartParity,
    pub air_rate: AirDataRate,
    pub power: TxPower,
    pub tx_mode: TransmissionMode,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self::new(0, DEFAULT_CHANNEL)
    }
}

impl RadioConfig {

    /// Configuration with a given address and channel and factory defaults for everything else
    pub fn new(addr: u16, channel: u8) -> Self {
        let [addr_h, addr_l] = addr.to_be_bytes();
        Self {
            addr_h,
            addr_l,
            channel,
            uart_baud: UartBaudRate::default(),
            parity: UartParity::default(),
            air_rate: AirDataRate::default(),
            power: TxPower::default(),
            tx_mode: TransmissionMode::default(),
        }
    }

    /// Decode a parameter block read from the module
    pub fn from_params(params: &Params, layout: &FrameLayout) -> Self {
        let (parity, uart_baud, air_rate) = unpack_speed_byte(params.sped());
        let (power, tx_mode) = layout.unpack_option_byte(params.option());
        Self {
            addr_h: params.addr_h(),
            addr_l: params.addr_l(),
            channel: params.channel(),
            uart_baud,
            parity,
            air_rate,
            power,
            tx_mode,
        }
    }

    /// Module address on 16 bits
    pub fn addr(&self) -> u16 {
        u16::from_be_bytes([self.addr_h, self.addr_l])
    }
}
