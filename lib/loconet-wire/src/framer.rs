// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scans a [`RingBuffer`] for complete, checksummed Loconet frames.

use crate::checksum;
use crate::opcode::LengthClass;
use crate::ring_buffer::RingBuffer;

/// Largest frame the Framer will ever assemble. A `Variable`-class length
/// byte is itself a data byte (bit 7 clear), so it cannot exceed 127.
pub const MAX_FRAME_LEN: usize = 127;
/// Largest payload (frame minus opcode, length byte, and checksum).
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - 3;

/// A fully verified frame, ready for dispatch.
#[derive(Clone)]
pub struct Frame {
    pub opcode: u8,
    payload: [u8; MAX_PAYLOAD_LEN],
    payload_len: usize,
}

impl Frame {
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_len]
    }
}

/// Result of one [`Framer::process`] call.
pub enum FrameOutcome {
    /// Not enough bytes buffered yet to make progress.
    Idle,
    /// Debris, a bad checksum, or a collision-truncated frame was skipped;
    /// call `process` again immediately.
    Retry,
    /// A checksum-valid frame was extracted and consumed from the ring.
    Frame(Frame),
}

/// Stateless frame scanner: all state lives in the [`RingBuffer`] it is
/// handed each call, so one `Framer` can be reused across calls with no
/// fields of its own.
#[derive(Default)]
pub struct Framer;

impl Framer {
    pub const fn new() -> Self {
        Framer
    }

    /// Scans and, if possible, extracts one frame from `ring`. The caller
    /// (the main-loop driver) should call this in a tight loop while it
    /// returns `Processed`-equivalent outcomes (`Retry`/`Frame`), stopping
    /// on `Idle`.
    pub fn process<const N: usize>(&self, ring: &mut RingBuffer<N>) -> FrameOutcome {
        if ring.available() < 2 {
            return FrameOutcome::Idle;
        }

        let opcode = ring.peek(0).expect("checked available() >= 2 above");
        let Some(class) = LengthClass::from_opcode(opcode) else {
            // Out-of-frame debris: a data byte where an opcode was expected.
            ring.advance(1);
            return FrameOutcome::Retry;
        };

        let length = match class.fixed_length() {
            Some(len) => len,
            None => {
                let len = ring.peek(1).expect("checked available() >= 2 above");
                len as usize
            }
        };

        if length < 2 || length > MAX_FRAME_LEN {
            // Malformed length byte; treat the opcode itself as debris so
            // the scan can make progress.
            ring.advance(1);
            return FrameOutcome::Retry;
        }

        // A frame counts as fully present once `available() >= length`; the
        // in-band scan below only ever looks at bytes already sitting in the
        // ring, never past `head`.
        let scanned = (length - 1).min(ring.available());
        for i in 1..scanned {
            if let Some(byte) = ring.peek(i) {
                if byte & 0x80 != 0 {
                    // A second opcode byte showed up before this frame's
                    // checksum position: the frame in progress was
                    // truncated by a collision. Resynchronise on the new
                    // opcode without dispatching anything.
                    ring.advance(i);
                    return FrameOutcome::Retry;
                }
            }
        }

        if ring.available() < length {
            return FrameOutcome::Idle;
        }

        let mut raw = [0u8; MAX_FRAME_LEN];
        let consumed = ring.read_into(&mut raw[..length]);
        debug_assert!(consumed, "available() >= length was just checked");

        if !checksum::verify(&raw[..length]) {
            return FrameOutcome::Retry;
        }

        let payload_start = match class {
            LengthClass::Variable => 2,
            _ => 1,
        };
        let payload_end = length - 1; // exclude checksum
        let payload_len = payload_end - payload_start;

        let mut payload = [0u8; MAX_PAYLOAD_LEN];
        payload[..payload_len].copy_from_slice(&raw[payload_start..payload_end]);

        FrameOutcome::Frame(Frame { opcode, payload, payload_len })
    }
}
