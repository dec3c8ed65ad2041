// Command codecs: pure functions building requests and decoding responses

pub mod cmd_params;
pub mod cmd_system;
