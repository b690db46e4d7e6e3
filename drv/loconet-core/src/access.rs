// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CSMA/CD bus access: the single timer-driven state machine that decides
//! when the line is idle enough to transmit, drives an outbound message
//! byte by byte with self-echo verification, and detects and recovers
//! from collisions.

use crate::message::OutboundMessage;
use crate::transport::Transport;

/// One bit time at 16.66 kbit/s, rounded to whole microseconds.
pub const BIT_TIME_US: u32 = 60;
/// Carrier detect delay: the bus must be quiet this long before any node
/// may consider transmitting.
pub const CARRIER_DELAY_US: u32 = 1200;
/// Extra delay a non-master node waits after carrier detect.
pub const MASTER_DELAY_US: u32 = 360;
/// Line-break hold time, both for a self-induced collision jam and for
/// recognising one detected on receive.
pub const LINE_BREAK_US: u32 = 900;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Receiving,
    DelayCarrier,
    DelayMaster,
    DelayPriority,
    Transmitting,
    CollisionLineBreak,
}

/// Outcome of a byte received while transmitting, compared against the
/// message's own bytes (self-echo check).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EchoResult {
    /// Either not transmitting, or the byte matched: keep going.
    Continue,
    /// The echoed byte didn't match what was sent: a collision.
    Collision,
}

pub struct AccessStateMachine {
    state: State,
    is_master: bool,
    priority: u8,
    current: Option<OutboundMessage>,
}

impl AccessStateMachine {
    pub fn new(is_master: bool, priority: u8) -> Self {
        Self { state: State::Idle, is_master, priority, current: None }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    pub fn has_current(&self) -> bool {
        self.current.is_some()
    }

    pub fn set_priority(&mut self, priority: u8) {
        self.priority = priority;
    }

    pub fn on_edge_rising(&mut self, transport: &mut impl Transport) {
        match self.state {
            State::Transmitting | State::CollisionLineBreak => {}
            _ => {
                transport.arm_timer(CARRIER_DELAY_US);
                self.state = State::DelayCarrier;
            }
        }
    }

    pub fn on_edge_falling(&mut self, transport: &mut impl Transport) {
        match self.state {
            State::Transmitting | State::CollisionLineBreak => {}
            State::Idle => {
                transport.arm_timer(LINE_BREAK_US);
                self.state = State::Receiving;
            }
            _ => {
                // Any edge during the carrier/master/priority chain
                // restarts it at the top.
                transport.arm_timer(CARRIER_DELAY_US);
                self.state = State::DelayCarrier;
            }
        }
    }

    pub fn on_timer_expiry(&mut self, transport: &mut impl Transport) {
        match self.state {
            State::DelayCarrier => {
                if self.is_master {
                    self.state = State::Idle;
                } else {
                    transport.arm_timer(MASTER_DELAY_US);
                    self.state = State::DelayMaster;
                }
            }
            State::DelayMaster => {
                if self.priority > 0 {
                    transport.arm_timer(self.priority as u32 * BIT_TIME_US);
                    self.state = State::DelayPriority;
                } else {
                    self.state = State::Idle;
                }
            }
            State::DelayPriority => {
                self.state = State::Idle;
            }
            State::CollisionLineBreak => {
                transport.release_line_break();
                self.state = State::Idle;
            }
            State::Receiving => {
                // No further edge arrived within the line-break window:
                // the bus has gone quiet on its own.
                self.state = State::Idle;
            }
            State::Idle | State::Transmitting => {
                // No timer should be armed here; a spurious expiry is
                // simply ignored rather than treated as an error.
            }
        }
    }

    /// Starts driving `message` onto the wire. Only valid when
    /// `is_idle() && !has_current()`; callers are expected to check both
    /// (see `LoconetCore::poll`).
    pub fn begin_transmit(&mut self, transport: &mut impl Transport, mut message: OutboundMessage) {
        message.reset_indices();
        if let Some(&first) = message.data().first() {
            transport.transmit_byte(first);
            message.tx_index = 1;
        }
        transport.enable_dre_interrupt();
        self.current = Some(message);
        self.state = State::Transmitting;
    }

    /// Feeds the next outbound byte once the UART signals it's ready.
    pub fn on_dre_ready(&mut self, transport: &mut impl Transport) {
        if self.state != State::Transmitting {
            return;
        }
        if let Some(msg) = self.current.as_mut() {
            if msg.tx_index < msg.data().len() {
                transport.transmit_byte(msg.data()[msg.tx_index]);
                msg.tx_index += 1;
            } else {
                transport.disable_dre_interrupt();
            }
        }
    }

    /// Compares a received byte against the message in flight. Has no
    /// effect outside `Transmitting`.
    pub fn check_echo(&mut self, byte: u8) -> EchoResult {
        if self.state != State::Transmitting {
            return EchoResult::Continue;
        }
        let Some(msg) = self.current.as_mut() else {
            return EchoResult::Continue;
        };
        if msg.rx_index >= msg.data().len() {
            return EchoResult::Continue;
        }
        let expected = msg.data()[msg.rx_index];
        if byte != expected {
            return EchoResult::Collision;
        }
        msg.rx_index += 1;
        EchoResult::Continue
    }

    /// A framing error arrived while transmitting: always a collision.
    pub fn has_framing_error_collision(&self) -> bool {
        self.state == State::Transmitting
    }

    /// Jams the line, arms the line-break timer, and hands back the
    /// message in flight (with its indices reset) for the caller to
    /// requeue.
    pub fn begin_collision(&mut self, transport: &mut impl Transport) -> Option<OutboundMessage> {
        transport.assert_line_break();
        transport.disable_dre_interrupt();
        transport.arm_timer(LINE_BREAK_US);
        self.state = State::CollisionLineBreak;
        self.current.take().map(|mut m| {
            m.reset_indices();
            m
        })
    }

    /// The UART finished shifting out the whole message: free it and
    /// settle back toward idle.
    pub fn on_tx_complete(&mut self) -> Option<OutboundMessage> {
        self.state = State::Idle;
        self.current.take()
    }
}
