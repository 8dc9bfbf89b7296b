//! BoosterGen wire protocol.
//!
//! Every command is one fixed 3-byte frame: two magic prefix bytes followed
//! by the raw command index. No length field, no checksum, no acknowledgment.

use thiserror::Error;

use crate::domain::catalog::COMMANDS;

pub const FRAME_PREFIX: [u8; 2] = [0xFF, 0x9B];
pub const FRAME_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireFrame([u8; FRAME_LEN]);

impl WireFrame {
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for WireFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("command index {0} is outside the catalog range 1..={}", COMMANDS.len())]
    InvalidCommandIndex(u8),
}

/// Encodes a command index into its wire frame. Indices outside the catalog
/// are a contract violation and are rejected, never clamped.
pub fn encode(index: u8) -> Result<WireFrame, ProtocolError> {
    if index == 0 || index as usize > COMMANDS.len() {
        return Err(ProtocolError::InvalidCommandIndex(index));
    }
    Ok(WireFrame([FRAME_PREFIX[0], FRAME_PREFIX[1], index]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_catalog_index_encodes_to_prefix_plus_index() {
        for index in 1..=COMMANDS.len() as u8 {
            let frame = encode(index).unwrap();
            assert_eq!(frame.as_bytes(), &[0xFF, 0x9B, index]);
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        assert_eq!(encode(4).unwrap(), encode(4).unwrap());
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        assert_eq!(encode(0), Err(ProtocolError::InvalidCommandIndex(0)));
        assert_eq!(encode(8), Err(ProtocolError::InvalidCommandIndex(8)));
        assert_eq!(encode(255), Err(ProtocolError::InvalidCommandIndex(255)));
    }
}
