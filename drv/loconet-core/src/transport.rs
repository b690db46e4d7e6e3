// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The boundary between [`crate::LoconetCore`] and the outside world: the
//! bus transceiver, the persistent config store, and the application
//! callbacks that want to hear about incoming traffic.
//!
//! Everything in this module is a trait or a plain data/function-pointer
//! bundle. `LoconetCore` is generic over `Transport` and `ConfigStore` so a
//! test can supply an in-memory fake of each without touching any real
//! hardware.

use bitflags::bitflags;

use crate::fastclock::ClockTime;
use crate::lncv::AckCode;

bitflags! {
    /// Bits a real driver task would wait on in its notification receive
    /// call. Each one corresponds to a row in the access state machine's
    /// event table or to a background chore `LoconetCore::poll` needs to
    /// run.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct EventMask: u32 {
        /// The bus line transitioned low-to-high.
        const EDGE_RISING = 1 << 0;
        /// The bus line transitioned high-to-low.
        const EDGE_FALLING = 1 << 1;
        /// The single access-machine timer expired.
        const TIMER = 1 << 2;
        /// A byte finished shifting in; call `Transport::take_rx_byte`.
        const RX_BYTE = 1 << 3;
        /// The UART reported a framing error on the byte just shifted in.
        const FRAMING_ERROR = 1 << 4;
        /// The UART's data register is empty and ready for the next
        /// outbound byte.
        const TX_DRE_READY = 1 << 5;
        /// The UART finished shifting out the last byte of a message.
        const TX_COMPLETE = 1 << 6;
        /// The periodic fast-clock tick (every 50 ms) fired.
        const CLOCK_TICK = 1 << 7;
    }
}

/// Hardware access the core needs: the single access-machine timer, the
/// half-duplex bus line, and the byte-wide UART shift register.
///
/// Implementors own the interrupt plumbing; `LoconetCore`'s `on_*` methods
/// are meant to be called directly from interrupt context (they do no
/// allocation and never block), with `poll` run from the main loop.
pub trait Transport {
    /// Arms the access-machine timer for `micros` microseconds, replacing
    /// any timer already armed.
    fn arm_timer(&mut self, micros: u32);

    /// Starts shifting `byte` out on the bus.
    fn transmit_byte(&mut self, byte: u8);

    /// Enables the "data register empty" interrupt so the driver is told
    /// when it's time to feed the next outbound byte.
    fn enable_dre_interrupt(&mut self);

    /// Disables the "data register empty" interrupt.
    fn disable_dre_interrupt(&mut self);

    /// Drives the bus line low to jam a collision, independent of the
    /// UART's own framing.
    fn assert_line_break(&mut self);

    /// Releases the line break and re-enables normal reception.
    fn release_line_break(&mut self);

    /// Takes the most recently received byte, if one is pending.
    fn take_rx_byte(&mut self) -> Option<u8>;

    /// Blocks until at least one bit in `mask` is pending, returning the
    /// full set of bits that are currently set.
    fn wait_events(&mut self, mask: EventMask) -> EventMask;
}

/// Persistent storage for LNCVs (loconet configuration variables), keyed
/// by number `0..MAX_LNCV`.
pub trait ConfigStore {
    /// Reads a variable. `None` if the store has never been formatted.
    fn read_lncv(&self, number: u16) -> Option<u16>;

    /// Writes a variable, persisting it before returning.
    fn write_lncv(&mut self, number: u16, value: u16) -> Result<(), crate::error::CoreError>;

    /// Initializes the store to its default values.
    fn format(&mut self) -> Result<(), crate::error::CoreError>;
}

/// Capability bundle the application supplies at construction, replacing
/// the original firmware's weak-symbol default handlers. Every field
/// defaults to a no-op, so an application only needs to set the ones it
/// cares about.
#[derive(Clone)]
pub struct Handlers {
    /// A switch/turnout request was received: `(sub_address, direction_and_output)`.
    pub on_switch_req: fn(u8, u8),
    /// A sensor input report was received: `(sub_address, state)`.
    pub on_input_rep: fn(u8, u8),
    /// Called once an LNCV write has been persisted.
    pub on_lncv_written: fn(u16, u16),
    /// Consulted before persisting an LNCV write; return anything other
    /// than `AckCode::Ok` to refuse it.
    pub write_allowed: fn(u16, u16) -> AckCode,
    /// Called on every fast-clock minute rollover.
    pub on_fast_clock_update: fn(ClockTime),
    /// A peer-xfer frame (opcode 0xE5/0xED, 12-byte payload) whose source
    /// byte is not `LNCV_SRC_KPU`, so the LNCV engine doesn't claim it:
    /// `(opcode, payload)`.
    pub on_peer_xfer: fn(u8, &[u8]),
    /// Fallback for any opcode the core does not otherwise claim:
    /// `(opcode, payload)`.
    pub on_unhandled: fn(u8, &[u8]),
}

impl Default for Handlers {
    fn default() -> Self {
        fn noop_switch_req(_sub_address: u8, _data: u8) {}
        fn noop_input_rep(_sub_address: u8, _state: u8) {}
        fn noop_lncv_written(_number: u16, _value: u16) {}
        fn allow_all(_number: u16, _value: u16) -> AckCode {
            AckCode::Ok
        }
        fn noop_fast_clock_update(_time: ClockTime) {}
        fn noop_peer_xfer(_opcode: u8, _payload: &[u8]) {}
        fn noop_unhandled(_opcode: u8, _payload: &[u8]) {}

        Handlers {
            on_switch_req: noop_switch_req,
            on_input_rep: noop_input_rep,
            on_lncv_written: noop_lncv_written,
            write_allowed: allow_all,
            on_fast_clock_update: noop_fast_clock_update,
            on_peer_xfer: noop_peer_xfer,
            on_unhandled: noop_unhandled,
        }
    }
}
