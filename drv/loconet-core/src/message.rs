// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Builds outbound messages and tracks the byte-at-a-time transmit/echo
//! progress the access state machine drives them through.

use loconet_wire::MAX_FRAME_LEN;

/// An outbound message owned, in turn, by the transmit queue, the access
/// state machine while it's on the wire, and nobody once it's freed or
/// requeued after a collision.
pub struct OutboundMessage {
    pub priority: u8,
    data: heapless::Vec<u8, MAX_FRAME_LEN>,
    pub tx_index: usize,
    pub rx_index: usize,
}

impl OutboundMessage {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn reset_indices(&mut self) {
        self.tx_index = 0;
        self.rx_index = 0;
    }

    pub fn is_fully_sent(&self) -> bool {
        self.tx_index >= self.data.len()
    }
}

/// Assembles a checksummed, ready-to-transmit [`OutboundMessage`] for each
/// of the four opcode length classes.
pub struct MessageBuilder;

impl MessageBuilder {
    pub fn two(opcode: u8, priority: u8) -> OutboundMessage {
        Self::from_body(&[opcode], priority)
    }

    pub fn four(opcode: u8, d1: u8, d2: u8, priority: u8) -> OutboundMessage {
        Self::from_body(&[opcode, d1, d2], priority)
    }

    pub fn six(opcode: u8, d1: u8, d2: u8, d3: u8, d4: u8, priority: u8) -> OutboundMessage {
        Self::from_body(&[opcode, d1, d2, d3, d4], priority)
    }

    /// `payload` excludes the opcode and the length byte; both are added
    /// here, along with the trailing checksum.
    pub fn variable(opcode: u8, payload: &[u8], priority: u8) -> OutboundMessage {
        let length = (payload.len() + 3) as u8;
        let mut body: heapless::Vec<u8, MAX_FRAME_LEN> = heapless::Vec::new();
        let _ = body.push(opcode);
        let _ = body.push(length);
        let _ = body.extend_from_slice(payload);
        Self::finish(body, priority)
    }

    fn from_body(body_bytes: &[u8], priority: u8) -> OutboundMessage {
        let mut body: heapless::Vec<u8, MAX_FRAME_LEN> = heapless::Vec::new();
        let _ = body.extend_from_slice(body_bytes);
        Self::finish(body, priority)
    }

    fn finish(mut body: heapless::Vec<u8, MAX_FRAME_LEN>, priority: u8) -> OutboundMessage {
        let checksum = loconet_wire::checksum::compute(&body);
        let _ = body.push(checksum);
        OutboundMessage { priority, data: body, tx_index: 0, rx_index: 0 }
    }
}
