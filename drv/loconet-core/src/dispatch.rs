// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Routes a verified [`Frame`] to the component that owns its opcode:
//! the fast clock, the LNCV engine, or the application's own handlers.
//!
//! Most opcodes carry no core-level meaning at all -- a switch request or
//! sensor report is simply forwarded to the application. Only the two
//! `WR_SL_DATA`/`RD_SL_DATA` sub-opcodes and the two LNCV peer-xfer
//! opcodes need special-case routing; everything else falls through to
//! `Handlers::on_unhandled`, which plays the role the original firmware's
//! default weak-symbol handler did.
//!
//! Within the peer-xfer opcodes, only a frame whose source byte is
//! `LNCV_SRC_KPU` belongs to the LNCV engine -- anything else reaches
//! `Handlers::on_peer_xfer` instead, and the programming-task start/final
//! sub-opcodes fall to `on_unhandled` like any other opcode this core
//! doesn't own.

use loconet_wire::{opcode, Frame};

use crate::fastclock::FastClock;
use crate::lncv::LncvEngine;
use crate::transport::{ConfigStore, Handlers};
use crate::txqueue::TxQueue;

pub fn dispatch<S: ConfigStore>(
    frame: &Frame,
    handlers: &Handlers,
    lncv: &mut LncvEngine,
    fast_clock: &mut FastClock,
    tx: &mut TxQueue,
    config: &mut S,
    bus_address: &mut u16,
) {
    let payload = frame.payload();

    match frame.opcode {
        opcode::OPC_SW_REQ if payload.len() == 2 => {
            (handlers.on_switch_req)(payload[0], payload[1]);
        }
        opcode::OPC_INPUT_REP if payload.len() == 2 => {
            (handlers.on_input_rep)(payload[0], payload[1]);
        }
        opcode::OPC_WR_SL_DATA if payload.first() == Some(&opcode::SUBOP_FAST_CLOCK) => {
            fast_clock.on_message(payload, handlers);
        }
        // Programming-task start/final: this core has no state machine of
        // its own for them, so they fall to the same place any other
        // opcode it doesn't own would, but named explicitly rather than
        // caught by the wildcard arm below.
        opcode::OPC_WR_SL_DATA if payload.first() == Some(&opcode::SUBOP_PROG_TASK) => {
            (handlers.on_unhandled)(frame.opcode, payload);
        }
        opcode::OPC_RD_SL_DATA if payload.first() == Some(&opcode::SUBOP_PROG_TASK) => {
            (handlers.on_unhandled)(frame.opcode, payload);
        }
        opcode::OPC_PEER_XFER | opcode::OPC_PEER_XFER_ALT if payload.len() == 12 => {
            if payload.first() == Some(&opcode::LNCV_SRC_KPU) {
                lncv.on_peer_xfer(frame.opcode, payload, tx, config, bus_address, handlers);
            } else {
                (handlers.on_peer_xfer)(frame.opcode, payload);
            }
        }
        _ => {
            (handlers.on_unhandled)(frame.opcode, payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use core::cell::Cell;
    use loconet_wire::{FrameOutcome, Framer, RingBuffer};

    struct FakeStore;
    impl ConfigStore for FakeStore {
        fn read_lncv(&self, _number: u16) -> Option<u16> {
            None
        }
        fn write_lncv(&mut self, _number: u16, _value: u16) -> Result<(), CoreError> {
            Ok(())
        }
        fn format(&mut self) -> Result<(), CoreError> {
            Ok(())
        }
    }

    thread_local! {
        static SWITCH_SEEN: Cell<Option<(u8, u8)>> = Cell::new(None);
    }

    fn framed(opcode: u8, payload: &[u8]) -> Frame {
        let mut ring: RingBuffer<32> = RingBuffer::new();
        let mut body = heapless::Vec::<u8, 32>::new();
        let _ = body.push(opcode);
        if loconet_wire::LengthClass::from_opcode(opcode) == Some(loconet_wire::LengthClass::Variable)
        {
            let _ = body.push((payload.len() + 3) as u8);
        }
        let _ = body.extend_from_slice(payload);
        let checksum = loconet_wire::checksum::compute(&body);
        for b in body {
            ring.push(b).unwrap();
        }
        ring.push(checksum).unwrap();

        match Framer::new().process(&mut ring) {
            FrameOutcome::Frame(frame) => frame,
            _ => panic!("test payload did not frame cleanly"),
        }
    }

    #[test]
    fn switch_request_reaches_the_application_handler() {
        SWITCH_SEEN.with(|c| c.set(None));

        fn on_switch(a: u8, b: u8) {
            SWITCH_SEEN.with(|c| c.set(Some((a, b))));
        }

        let mut handlers = Handlers::default();
        handlers.on_switch_req = on_switch;

        let frame = framed(opcode::OPC_SW_REQ, &[0x15, 0x50]);
        let mut lncv = LncvEngine::new(1);
        let mut fast_clock = FastClock::new_slave();
        let mut tx = TxQueue::new();
        let mut store = FakeStore;
        let mut address = 1u16;

        dispatch(&frame, &handlers, &mut lncv, &mut fast_clock, &mut tx, &mut store, &mut address);

        assert_eq!(SWITCH_SEEN.with(|c| c.get()), Some((0x15, 0x50)));
    }

    thread_local! {
        static PEER_XFER_SEEN: Cell<Option<u8>> = Cell::new(None);
    }

    #[test]
    fn peer_xfer_from_a_non_kpu_source_skips_the_lncv_engine() {
        PEER_XFER_SEEN.with(|c| c.set(None));

        fn on_peer_xfer(opcode: u8, _payload: &[u8]) {
            PEER_XFER_SEEN.with(|c| c.set(Some(opcode)));
        }

        let mut handlers = Handlers::default();
        handlers.on_peer_xfer = on_peer_xfer;

        // A well-formed 12-byte peer-xfer payload whose source byte is
        // not `LNCV_SRC_KPU`: the LNCV engine must not claim it.
        let payload = [0x09, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let frame = framed(opcode::OPC_PEER_XFER, &payload);
        let mut lncv = LncvEngine::new(1);
        let mut fast_clock = FastClock::new_slave();
        let mut tx = TxQueue::new();
        let mut store = FakeStore;
        let mut address = 1u16;

        dispatch(&frame, &handlers, &mut lncv, &mut fast_clock, &mut tx, &mut store, &mut address);

        assert_eq!(PEER_XFER_SEEN.with(|c| c.get()), Some(opcode::OPC_PEER_XFER));
        assert!(!lncv.is_programming());
    }
}
