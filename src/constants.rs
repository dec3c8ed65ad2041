use embassy_time::Duration;

/// Header of a write-parameters command (parameters saved on power-down)
pub const HEAD_WRITE : u8 = 0xC0;
/// Alternate acknowledge header reported by some firmware revisions
pub const HEAD_ALT_ACK : u8 = 0xC2;
/// Read-parameters opcode (sent three times)
pub const OP_READ_PARAMS : u8 = 0xC1;
/// Read-version opcode (sent three times)
pub const OP_READ_VERSION : u8 = 0xC3;
/// Reset opcode (sent three times)
pub const OP_RESET : u8 = 0xC4;

/// Length of a parameter frame on the wire (header + 5 bytes)
pub const PARAM_FRAME_LEN : usize = 6;
/// Length of the parameter payload
pub const PARAM_LEN : usize = 5;
/// Length of a version response
pub const VERSION_RSP_LEN : usize = 4;

/// UART baudrate the module always uses in configuration mode (8N1)
pub const CONFIG_BAUD : u32 = 9600;

/// Address high byte used for fixed transmission when nothing was read from the module
pub const DEFAULT_ADDR_H : u8 = 0x00;
/// Address low byte used for fixed transmission when nothing was read from the module
pub const DEFAULT_ADDR_L : u8 = 0x00;
/// Channel used for fixed transmission when nothing was read from the module (433MHz)
pub const DEFAULT_CHANNEL : u8 = 0x17;

/// Line terminator used by the messaging layer
pub const LINE_TERMINATOR : u8 = b'\n';
/// Size of the receive line assembler
pub const RX_LINE_MAX : usize = 256;
/// Size of one radio packet: longer messages are split by the module
pub const MAX_PAYLOAD : usize = 58;

/// Interval between two reads of the AUX pin
pub const AUX_POLL_INTERVAL : Duration = Duration::from_millis(5);

/// Delay between driving M0/M1 and the AUX line becoming meaningful
pub const MODE_SETTLE : Duration = Duration::from_millis(50);
/// Budget for the module to become ready after entering configuration mode
pub const ENTER_READY_TIMEOUT : Duration = Duration::from_millis(3000);
/// Budget for the module to become ready after returning to normal mode
pub const EXIT_READY_TIMEOUT : Duration = Duration::from_millis(1000);
/// Budget for the module to process a command
pub const WRITE_READY_TIMEOUT : Duration = Duration::from_millis(1000);
/// Budget to collect a complete response
pub const RESPONSE_TIMEOUT : Duration = Duration::from_millis(1000);
/// Sleep between two empty reads of the UART
pub const READ_POLL_INTERVAL : Duration = Duration::from_millis(2);
