// System commands API: version and reset

use crate::constants::*;

use super::cmd_params::FrameError;

/// Request the module model and firmware version
pub fn read_version_req() -> [u8; 3] {
    [OP_READ_VERSION; 3]
}

/// Request a module reset
pub fn reset_cmd() -> [u8; 3] {
    [OP_RESET; 3]
}

/// Response for the read-version command: 0xC3, model, version, features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VersionRsp([u8; VERSION_RSP_LEN]);

impl VersionRsp {

    /// Validate and wrap a raw response
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < VERSION_RSP_LEN {
            return Err(FrameError::ShortResponse);
        }
        if bytes[0] != OP_READ_VERSION {
            return Err(FrameError::UnexpectedHeader(bytes[0]));
        }
        let mut rsp = [0u8; VERSION_RSP_LEN];
        rsp.copy_from_slice(&bytes[..VERSION_RSP_LEN]);
        Ok(Self(rsp))
    }

    /// Module model (frequency band, e.g. 0x32 for 433MHz)
    pub fn model(&self) -> u8 {
        self.0[1]
    }

    /// Firmware version
    pub fn version(&self) -> u8 {
        self.0[2]
    }

    /// Module features (vendor specific, usually the max power)
    pub fn features(&self) -> u8 {
        self.0[3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_rsp() {
        let rsp = VersionRsp::from_slice(&[0xC3, 0x32, 0x45, 0x14]);
        assert_eq!(rsp.map(|r| (r.model(), r.version(), r.features())), Ok((0x32, 0x45, 0x14)));
        assert_eq!(VersionRsp::from_slice(&[0xC3, 0x32]), Err(FrameError::ShortResponse));
        assert_eq!(VersionRsp::from_slice(&[0xC0, 0, 0, 0]), Err(FrameError::UnexpectedHeader(0xC0)));
    }

    #[test]
    fn opcodes() {
        assert_eq!(read_version_req(), [0xC3; 3]);
        assert_eq!(reset_cmd(), [0xC4; 3]);
    }
}
