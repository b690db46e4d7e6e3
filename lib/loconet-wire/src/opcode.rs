// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Opcode framing: length classes and the handful of opcode constants the
//! core needs to recognise by name (fast-clock, slot programming, LNCV
//! peer-xfer). Everything else is routed purely by the low 5 bits through
//! the Dispatcher's tables.

/// The four length classes selected by the top three bits of an opcode
/// byte (which always has bit 7 set, so the field's value is always in
/// `4..=7`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LengthClass {
    /// 2-byte total frame (opcode + checksum).
    Two,
    /// 4-byte total frame.
    Four,
    /// 6-byte total frame.
    Six,
    /// Length carried in the byte following the opcode, including the
    /// opcode and checksum in the count.
    Variable,
}

impl LengthClass {
    /// Classifies an opcode byte. Returns `None` if bit 7 is clear (it is
    /// not an opcode at all).
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        if opcode & 0x80 == 0 {
            return None;
        }
        Some(match opcode >> 5 {
            0b100 => LengthClass::Two,
            0b101 => LengthClass::Four,
            0b110 => LengthClass::Six,
            0b111 => LengthClass::Variable,
            _ => unreachable!("opcode top 3 bits are always 4..=7 once bit 7 is set"),
        })
    }

    /// The fixed total frame length, or `None` for `Variable` (the length
    /// lives on the wire instead).
    pub fn fixed_length(self) -> Option<usize> {
        match self {
            LengthClass::Two => Some(2),
            LengthClass::Four => Some(4),
            LengthClass::Six => Some(6),
            LengthClass::Variable => None,
        }
    }
}

/// The low 5 bits of an opcode select one of 32 handlers within its length
/// class.
pub fn handler_index(opcode: u8) -> usize {
    (opcode & 0x1F) as usize
}

/// Switch request (used in the worked switch-request scenario).
pub const OPC_SW_REQ: u8 = 0xB0;
/// Input report.
pub const OPC_INPUT_REP: u8 = 0xB2;
/// Long acknowledgement.
pub const OPC_LONG_ACK: u8 = 0xB4;
/// Write slot data, variable length. Sub-opcode in payload[0] selects
/// fast-clock-set (0x7B) or programming-task-start (0x7C).
pub const OPC_WR_SL_DATA: u8 = 0xEF;
/// Read slot data, variable length. Sub-opcode 0x7C is programming-task
/// final.
pub const OPC_RD_SL_DATA: u8 = 0xE7;
/// Peer transfer, variable length, primary form used for LNCV.
pub const OPC_PEER_XFER: u8 = 0xE5;
/// Peer transfer, variable length, secondary form used for LNCV.
pub const OPC_PEER_XFER_ALT: u8 = 0xED;

/// Sub-opcode (payload[0] of a `Variable` frame) for a fast-clock set.
pub const SUBOP_FAST_CLOCK: u8 = 0x7B;
/// Sub-opcode for programming-task start/final.
pub const SUBOP_PROG_TASK: u8 = 0x7C;
/// `LNCV` source identifier for a "KPU" (programming tool) peer.
pub const LNCV_SRC_KPU: u8 = 0x01;
/// `LNCV` source identifier this module uses when replying.
pub const LNCV_SRC_MODULE: u8 = 0x02;
