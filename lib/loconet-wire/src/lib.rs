// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire-level pieces of the Loconet link layer: the byte ring buffer
//! shared between the receive interrupt and the main loop, the XOR
//! checksum, opcode length-class framing, and the Framer that turns a
//! stream of bytes into verified frames.
//!
//! This crate knows nothing about bus arbitration, transmit queues, or the
//! LNCV/fast-clock protocols layered on top -- those live in
//! `loconet-core`, which depends on this crate for framing.

#![cfg_attr(not(test), no_std)]

pub mod checksum;
pub mod framer;
pub mod opcode;
pub mod ring_buffer;

pub use framer::{Frame, FrameOutcome, Framer, MAX_FRAME_LEN, MAX_PAYLOAD_LEN};
pub use opcode::LengthClass;
pub use ring_buffer::{RingBuffer, RingFull};
