// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [`LoconetCore`]: the single owner of every piece of mutable state a
//! node needs -- the access state machine, the receive ring and framer,
//! the transmit queue, and the LNCV/fast-clock engines -- wired to the
//! application through [`Transport`] and [`ConfigStore`].
//!
//! Its methods split the same way the original firmware split foreground
//! (interrupt) and background (main-loop) work: the `on_*` methods are
//! safe to call directly from interrupt context, and `poll` does
//! everything that can wait a little -- framing, dispatch, and deciding
//! whether to start the next transmission.

use crate::access::{AccessStateMachine, EchoResult};
use crate::config::{BusConfig, FastClockMode};
use crate::diagnostics::{self, LinkEvent};
use crate::dispatch::dispatch;
use crate::error::CoreError;
use crate::fastclock::FastClock;
use crate::lncv::LncvEngine;
use crate::transport::{ConfigStore, EventMask, Handlers, Transport};
use crate::txqueue::TxQueue;
use loconet_wire::{FrameOutcome, Framer, RingBuffer};

/// Size of the byte ring between the receive path and the Framer. Must be
/// at least `MAX_FRAME_LEN` so one collision-truncated frame can never
/// wedge the scanner.
const RING_CAPACITY: usize = 256;

pub struct LoconetCore<T: Transport, C: ConfigStore> {
    transport: T,
    config: C,
    ring: RingBuffer<RING_CAPACITY>,
    framer: Framer,
    access: AccessStateMachine,
    tx: TxQueue,
    lncv: LncvEngine,
    fast_clock: FastClock,
    handlers: Handlers,
    bus_address: u16,
}

impl<T: Transport, C: ConfigStore> LoconetCore<T, C> {
    /// Loads the bus configuration from `config` and builds a core ready
    /// to run. Fails only if the store has never been formatted.
    pub fn new(transport: T, mut config: C, handlers: Handlers) -> Result<Self, CoreError> {
        let bus_config = BusConfig::load(&mut config)?;

        // This node is always a Loconet accessory, never the command
        // station, so the access state machine's own notion of "master"
        // (which skips the extra post-carrier settle delay) is always
        // false here; it is unrelated to fast-clock mastership below.
        let access = AccessStateMachine::new(false, bus_config.priority);

        let fast_clock = match bus_config.fast_clock_mode {
            FastClockMode::Master => {
                let addr = bus_config.address.to_le_bytes();
                FastClock::new_master(addr[0], addr[1], 20)
            }
            FastClockMode::Slave | FastClockMode::Off => FastClock::new_slave(),
        };

        Ok(Self {
            transport,
            config,
            ring: RingBuffer::new(),
            framer: Framer::new(),
            access,
            tx: TxQueue::new(),
            lncv: LncvEngine::new(bus_config.device_class),
            fast_clock,
            handlers,
            bus_address: bus_config.address,
        })
    }

    pub fn bus_address(&self) -> u16 {
        self.bus_address
    }

    pub fn is_lncv_programming(&self) -> bool {
        self.lncv.is_programming()
    }

    pub fn fast_clock(&self) -> &FastClock {
        &self.fast_clock
    }

    pub fn enqueue(&mut self, message: crate::message::OutboundMessage) -> Result<(), CoreError> {
        self.tx.enqueue(message)
    }

    // -- Foreground (interrupt-context) entry points --------------------

    pub fn on_edge_rising(&mut self) {
        self.access.on_edge_rising(&mut self.transport);
    }

    pub fn on_edge_falling(&mut self) {
        self.access.on_edge_falling(&mut self.transport);
    }

    pub fn on_timer_expiry(&mut self) {
        self.access.on_timer_expiry(&mut self.transport);
    }

    pub fn on_dre_ready(&mut self) {
        self.access.on_dre_ready(&mut self.transport);
    }

    pub fn on_tx_complete(&mut self) {
        self.access.on_tx_complete();
    }

    pub fn on_fast_clock_tick(&mut self) {
        self.fast_clock.tick(&self.handlers, &mut self.tx);
    }

    /// A byte finished shifting in. Always pushed to the ring for the
    /// Framer; also checked against the message in flight if one is being
    /// transmitted.
    pub fn on_byte_received(&mut self, byte: u8) {
        if self.ring.push(byte).is_err() {
            diagnostics::record_link(LinkEvent::RingFull);
        }
        if self.access.check_echo(byte) == EchoResult::Collision {
            self.handle_collision();
        }
    }

    /// The UART reported a framing error. Only a collision while
    /// transmitting; otherwise the Framer's own checksum check is what
    /// catches corrupted frames.
    pub fn on_framing_error(&mut self) {
        if self.access.has_framing_error_collision() {
            self.handle_collision();
        }
    }

    fn handle_collision(&mut self) {
        diagnostics::record_link(LinkEvent::Collision);
        if let Some(message) = self.access.begin_collision(&mut self.transport) {
            // The slot just vacated by the in-flight message is free
            // again, so this can only fail if the pool was already full
            // of other queued messages; in that unlikely case the
            // collided message is dropped rather than losing something
            // else already waiting.
            let _ = self.tx.requeue_head(message);
        }
    }

    // -- Background (main-loop) entry point ------------------------------

    /// Drains every complete frame currently buffered, dispatching each
    /// one, then starts the next transmission if the bus is idle and
    /// something is waiting to go out.
    pub fn poll(&mut self) {
        loop {
            match self.framer.process(&mut self.ring) {
                FrameOutcome::Idle => break,
                FrameOutcome::Retry => continue,
                FrameOutcome::Frame(frame) => {
                    dispatch(
                        &frame,
                        &self.handlers,
                        &mut self.lncv,
                        &mut self.fast_clock,
                        &mut self.tx,
                        &mut self.config,
                        &mut self.bus_address,
                    );
                }
            }
        }

        if self.access.is_idle() && !self.access.has_current() {
            if let Some(message) = self.tx.dequeue() {
                self.access.begin_transmit(&mut self.transport, message);
            }
        }
    }

    /// Convenience entry point for a driver's main loop: waits for any
    /// event, routes it to the matching `on_*` method, then polls.
    /// Equivalent to calling each step by hand from a notification
    /// receive loop, which a task that wants finer control is free to do
    /// instead.
    pub fn run_once(&mut self) {
        let events = self.transport.wait_events(EventMask::all());

        if events.contains(EventMask::EDGE_RISING) {
            self.on_edge_rising();
        }
        if events.contains(EventMask::EDGE_FALLING) {
            self.on_edge_falling();
        }
        if events.contains(EventMask::TIMER) {
            self.on_timer_expiry();
        }
        if events.contains(EventMask::RX_BYTE) {
            while let Some(byte) = self.transport.take_rx_byte() {
                self.on_byte_received(byte);
            }
        }
        if events.contains(EventMask::FRAMING_ERROR) {
            self.on_framing_error();
        }
        if events.contains(EventMask::TX_DRE_READY) {
            self.on_dre_ready();
        }
        if events.contains(EventMask::TX_COMPLETE) {
            self.on_tx_complete();
        }
        if events.contains(EventMask::CLOCK_TICK) {
            self.on_fast_clock_tick();
        }

        self.poll();
    }
}
