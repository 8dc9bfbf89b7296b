//! Static command catalog for the BoosterGen kit.
//!
//! Labels and colors are presentation metadata only; the wire contract is
//! just the one-byte index.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// Wire index, 1-based.
    pub index: u8,
    pub label: &'static str,
    /// RGB hint used for the command button.
    pub color: (u8, u8, u8),
}

pub const COMMANDS: [Command; 7] = [
    Command { index: 1, label: "SENSITIVE +", color: (0x04, 0xA5, 0xB4) },
    Command { index: 2, label: "OIL CONTROL +", color: (0x04, 0xA5, 0xB4) },
    Command { index: 3, label: "UNI TONE +", color: (0xA8, 0xB2, 0xE2) },
    Command { index: 4, label: "ANTI-AGING +", color: (0xCB, 0xA3, 0xD8) },
    Command { index: 5, label: "DEEP CARE +", color: (0xE8, 0x6B, 0x7D) },
    Command { index: 6, label: "ANTI-OX VITA C +", color: (0xFA, 0x9C, 0x71) },
    Command { index: 7, label: "ACNE FREE +", color: (0xD9, 0xE2, 0x46) },
];

pub fn by_index(index: u8) -> Option<&'static Command> {
    COMMANDS.iter().find(|c| c.index == index)
}
