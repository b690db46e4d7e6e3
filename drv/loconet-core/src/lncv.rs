// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! LNCV (Loconet configuration variable) peer-programming: entering and
//! leaving programming mode, and reading or writing a variable once in
//! it.

use crate::diagnostics::{self, LncvEvent};
use crate::message::MessageBuilder;
use crate::msb7;
use crate::transport::{ConfigStore, Handlers};
use crate::txqueue::TxQueue;
use loconet_wire::opcode;

/// One past the highest valid LNCV number.
pub const MAX_LNCV: u16 = 240;
/// LNCV 0 is always the module's bus address.
pub const LNCV_ADDRESS: u16 = 0;
/// LNCV 1 is always the module's device class, and is read-only.
pub const LNCV_DEVICE_CLASS: u16 = 1;

static_assertions::const_assert!(LNCV_ADDRESS < MAX_LNCV);
static_assertions::const_assert!(LNCV_DEVICE_CLASS < MAX_LNCV);

const FLAG_PROG_OFF: u8 = 0x00;
const FLAG_PROG_ON: u8 = 0x01;

const REQUEST_READ: u8 = 0x00;
const REQUEST_WRITE: u8 = 0x01;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AckCode {
    Ok = 0x7F,
    ReadOnly = 0x00,
    InvalidValue = 0x01,
    OutOfRange = 0x40,
}

/// The 12-byte LNCV peer-xfer payload (after opcode and length byte).
/// Bit 7 of `device_class`, `lncv_number`, `lncv_value`, and `flags` as
/// they sit on the wire is relocated into a dedicated `msb` byte by
/// `msb7::pack`/`unpack`; `destination` is outside that range and instead
/// uses a 14-bit low/high 7-bit split, so every byte of the frame stays
/// 7-bit clean.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LncvMessage {
    pub source: u8,
    pub destination: u16,
    pub request_id: u8,
    pub device_class: u16,
    pub lncv_number: u16,
    pub lncv_value: u16,
    pub flags: u8,
}

impl LncvMessage {
    pub const WIRE_LEN: usize = 12;

    pub fn decode(payload: &[u8]) -> Option<Self> {
        if payload.len() != Self::WIRE_LEN {
            return None;
        }
        let mut body = [0u8; 7];
        body.copy_from_slice(&payload[5..12]);
        msb7::unpack(&mut body, payload[4]);

        Some(Self {
            source: payload[0],
            // Low/high 7-bit split, the same convention switch and sensor
            // addresses use elsewhere on the bus: every byte outside the
            // msb-packed range must stay 7-bit clean on its own.
            destination: (payload[1] as u16 & 0x7F) | ((payload[2] as u16 & 0x7F) << 7),
            request_id: payload[3],
            device_class: u16::from_le_bytes([body[0], body[1]]),
            lncv_number: u16::from_le_bytes([body[2], body[3]]),
            lncv_value: u16::from_le_bytes([body[4], body[5]]),
            flags: body[6],
        })
    }

    pub fn encode(&self) -> [u8; Self::WIRE_LEN] {
        let mut out = [0u8; Self::WIRE_LEN];
        out[0] = self.source;
        out[1] = (self.destination & 0x7F) as u8;
        out[2] = ((self.destination >> 7) & 0x7F) as u8;
        out[3] = self.request_id;

        let class = self.device_class.to_le_bytes();
        let number = self.lncv_number.to_le_bytes();
        let value = self.lncv_value.to_le_bytes();
        let mut body = [class[0], class[1], number[0], number[1], value[0], value[1], self.flags];
        out[4] = msb7::pack(&mut body);
        out[5..12].copy_from_slice(&body);
        out
    }
}

pub struct LncvEngine {
    device_class: u16,
    programming: bool,
}

impl LncvEngine {
    pub fn new(device_class: u16) -> Self {
        Self { device_class, programming: false }
    }

    pub fn is_programming(&self) -> bool {
        self.programming
    }

    /// Handles one LNCV peer-xfer frame. `request_opcode` is the opcode
    /// of the frame it arrived on (`0xE5` or `0xED`), needed verbatim for
    /// the `LONG_ACK` this may send back.
    pub fn on_peer_xfer<S: ConfigStore>(
        &mut self,
        request_opcode: u8,
        payload: &[u8],
        tx: &mut TxQueue,
        config: &mut S,
        bus_address: &mut u16,
        handlers: &Handlers,
    ) {
        let Some(msg) = LncvMessage::decode(payload) else {
            return;
        };

        if msg.lncv_number == LNCV_ADDRESS && msg.device_class == self.device_class {
            match msg.flags {
                FLAG_PROG_ON if msg.lncv_value == 0xFFFF || msg.lncv_value == *bus_address => {
                    self.programming = true;
                    diagnostics::record_lncv(LncvEvent::ProgrammingEntered);
                    return;
                }
                FLAG_PROG_OFF => {
                    self.programming = false;
                    diagnostics::record_lncv(LncvEvent::ProgrammingExited);
                    return;
                }
                _ => {}
            }
        }

        match msg.request_id {
            REQUEST_WRITE => self.handle_write(request_opcode, &msg, tx, config, bus_address, handlers),
            _ => self.handle_read(request_opcode, &msg, tx, config),
        }
    }

    fn handle_read<S: ConfigStore>(&self, request_opcode: u8, msg: &LncvMessage, tx: &mut TxQueue, config: &mut S) {
        if msg.lncv_number >= MAX_LNCV {
            self.send_long_ack(request_opcode, tx, AckCode::OutOfRange);
            return;
        }
        let value = config.read_lncv(msg.lncv_number).unwrap_or(0);
        let response = LncvMessage {
            source: opcode::LNCV_SRC_MODULE,
            destination: msg.source as u16,
            request_id: REQUEST_READ,
            device_class: msg.device_class,
            lncv_number: msg.lncv_number,
            lncv_value: value,
            flags: 0,
        };
        let message = MessageBuilder::variable(request_opcode, &response.encode(), 1);
        let _ = tx.enqueue(message);
    }

    fn handle_write<S: ConfigStore>(
        &mut self,
        request_opcode: u8,
        msg: &LncvMessage,
        tx: &mut TxQueue,
        config: &mut S,
        bus_address: &mut u16,
        handlers: &Handlers,
    ) {
        if !self.programming {
            return;
        }
        if msg.lncv_number >= MAX_LNCV {
            self.send_long_ack(request_opcode, tx, AckCode::OutOfRange);
            return;
        }
        if msg.lncv_number == LNCV_DEVICE_CLASS {
            self.send_long_ack(request_opcode, tx, AckCode::ReadOnly);
            return;
        }

        let ack = (handlers.write_allowed)(msg.lncv_number, msg.lncv_value);
        if ack != AckCode::Ok {
            diagnostics::record_lncv(LncvEvent::Nacked(msg.lncv_number));
            self.send_long_ack(request_opcode, tx, ack);
            return;
        }

        let current = config.read_lncv(msg.lncv_number).unwrap_or(0);
        if current != msg.lncv_value && config.write_lncv(msg.lncv_number, msg.lncv_value).is_ok() {
            diagnostics::record_lncv(LncvEvent::Written(msg.lncv_number));
            (handlers.on_lncv_written)(msg.lncv_number, msg.lncv_value);
            if msg.lncv_number == LNCV_ADDRESS {
                *bus_address = msg.lncv_value;
            }
        }
    }

    fn send_long_ack(&self, request_opcode: u8, tx: &mut TxQueue, ack: AckCode) {
        let message = MessageBuilder::four(opcode::OPC_LONG_ACK, request_opcode & 0x7F, ack as u8, 1);
        let _ = tx.enqueue(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeStore {
        values: [Option<u16>; MAX_LNCV as usize],
    }

    impl FakeStore {
        fn new() -> Self {
            Self { values: [None; MAX_LNCV as usize] }
        }
    }

    impl ConfigStore for FakeStore {
        fn read_lncv(&self, number: u16) -> Option<u16> {
            self.values[number as usize]
        }
        fn write_lncv(&mut self, number: u16, value: u16) -> Result<(), crate::error::CoreError> {
            self.values[number as usize] = Some(value);
            Ok(())
        }
        fn format(&mut self) -> Result<(), crate::error::CoreError> {
            self.values = [None; MAX_LNCV as usize];
            Ok(())
        }
    }

    fn peer_xfer(source: u8, request_id: u8, device_class: u16, number: u16, value: u16, flags: u8) -> [u8; 12] {
        LncvMessage { source, destination: 0, request_id, device_class, lncv_number: number, lncv_value: value, flags }
            .encode()
    }

    #[test]
    fn round_trips_through_the_wire_encoding() {
        let msg = LncvMessage {
            source: 1,
            destination: 0x1E2D, // a 14-bit address: both wire bytes stay under 0x80
            request_id: REQUEST_WRITE,
            device_class: 0x1234,
            lncv_number: 7,
            lncv_value: 0xFFFF,
            flags: 0x01,
        };
        assert_eq!(LncvMessage::decode(&msg.encode()), Some(msg));
    }

    #[test]
    fn enters_and_leaves_programming_mode() {
        let mut engine = LncvEngine::new(99);
        let mut tx = TxQueue::new();
        let mut store = FakeStore::new();
        let mut address = 5u16;
        let handlers = Handlers::default();

        let enter = peer_xfer(1, REQUEST_READ, 99, LNCV_ADDRESS, 0xFFFF, FLAG_PROG_ON);
        engine.on_peer_xfer(opcode::OPC_PEER_XFER, &enter, &mut tx, &mut store, &mut address, &handlers);
        assert!(engine.is_programming());

        let leave = peer_xfer(1, REQUEST_READ, 99, LNCV_ADDRESS, 0, FLAG_PROG_OFF);
        engine.on_peer_xfer(opcode::OPC_PEER_XFER, &leave, &mut tx, &mut store, &mut address, &handlers);
        assert!(!engine.is_programming());
    }

    #[test]
    fn write_outside_programming_mode_is_ignored() {
        let mut engine = LncvEngine::new(99);
        let mut tx = TxQueue::new();
        let mut store = FakeStore::new();
        let mut address = 5u16;
        let handlers = Handlers::default();

        let write = peer_xfer(1, REQUEST_WRITE, 99, 10, 42, 0);
        engine.on_peer_xfer(opcode::OPC_PEER_XFER, &write, &mut tx, &mut store, &mut address, &handlers);
        assert_eq!(store.read_lncv(10), None);
        assert!(tx.is_empty());
    }

    #[test]
    fn write_persists_and_notifies_when_allowed() {
        let mut engine = LncvEngine::new(99);
        let mut tx = TxQueue::new();
        let mut store = FakeStore::new();
        let mut address = 5u16;
        let handlers = Handlers::default();

        let enter = peer_xfer(1, REQUEST_READ, 99, LNCV_ADDRESS, 0xFFFF, FLAG_PROG_ON);
        engine.on_peer_xfer(opcode::OPC_PEER_XFER, &enter, &mut tx, &mut store, &mut address, &handlers);

        let write = peer_xfer(1, REQUEST_WRITE, 99, 10, 42, 0);
        engine.on_peer_xfer(opcode::OPC_PEER_XFER, &write, &mut tx, &mut store, &mut address, &handlers);
        assert_eq!(store.read_lncv(10), Some(42));
    }

    #[test]
    fn writing_the_address_lncv_rebinds_bus_address() {
        let mut engine = LncvEngine::new(99);
        let mut tx = TxQueue::new();
        let mut store = FakeStore::new();
        let mut address = 5u16;
        let handlers = Handlers::default();

        let enter = peer_xfer(1, REQUEST_READ, 99, LNCV_ADDRESS, 0xFFFF, FLAG_PROG_ON);
        engine.on_peer_xfer(opcode::OPC_PEER_XFER, &enter, &mut tx, &mut store, &mut address, &handlers);

        let write = peer_xfer(1, REQUEST_WRITE, 99, LNCV_ADDRESS, 77, 0);
        engine.on_peer_xfer(opcode::OPC_PEER_XFER, &write, &mut tx, &mut store, &mut address, &handlers);
        assert_eq!(address, 77);
    }

    #[test]
    fn device_class_lncv_is_read_only() {
        let mut engine = LncvEngine::new(99);
        let mut tx = TxQueue::new();
        let mut store = FakeStore::new();
        let mut address = 5u16;
        let handlers = Handlers::default();

        let enter = peer_xfer(1, REQUEST_READ, 99, LNCV_ADDRESS, 0xFFFF, FLAG_PROG_ON);
        engine.on_peer_xfer(opcode::OPC_PEER_XFER, &enter, &mut tx, &mut store, &mut address, &handlers);

        let write = peer_xfer(1, REQUEST_WRITE, 99, LNCV_DEVICE_CLASS, 5, 0);
        engine.on_peer_xfer(opcode::OPC_PEER_XFER, &write, &mut tx, &mut store, &mut address, &handlers);
        assert!(!tx.is_empty()); // a LONG_ACK(ReadOnly) went out
    }

    #[test]
    fn out_of_range_number_is_nacked() {
        let mut engine = LncvEngine::new(99);
        let mut tx = TxQueue::new();
        let mut store = FakeStore::new();
        let mut address = 5u16;
        let handlers = Handlers::default();

        let read = peer_xfer(1, REQUEST_READ, 99, MAX_LNCV, 0, 0);
        engine.on_peer_xfer(opcode::OPC_PEER_XFER, &read, &mut tx, &mut store, &mut address, &handlers);
        assert!(!tx.is_empty());
    }
}
