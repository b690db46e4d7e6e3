// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Diagnostic history for the core: a handful of de-duplicating ring
//! buffers, one per subsystem, that a debugger can inspect without a
//! logger attached. Recording an entry never influences behaviour.

use loconet_ringbuf::{diag_entry, diag_ringbuf};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum LinkEvent {
    #[default]
    None,
    Collision,
    RingFull,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum QueueEvent {
    #[default]
    None,
    Full,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum LncvEvent {
    #[default]
    None,
    ProgrammingEntered,
    ProgrammingExited,
    Written(u16),
    Nacked(u16),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ClockEvent {
    #[default]
    None,
    SlaveSynced,
    MasterBroadcast,
}

diag_ringbuf!(LINK_EVENTS, LinkEvent, 16, LinkEvent::None);
diag_ringbuf!(QUEUE_EVENTS, QueueEvent, 16, QueueEvent::None);
diag_ringbuf!(LNCV_EVENTS, LncvEvent, 16, LncvEvent::None);
diag_ringbuf!(CLOCK_EVENTS, ClockEvent, 16, ClockEvent::None);

pub fn record_link(event: LinkEvent) {
    diag_entry!(LINK_EVENTS, event);
}

pub fn record_queue(event: QueueEvent) {
    diag_entry!(QUEUE_EVENTS, event);
}

pub fn record_lncv(event: LncvEvent) {
    diag_entry!(LNCV_EVENTS, event);
}

pub fn record_clock(event: ClockEvent) {
    diag_entry!(CLOCK_EVENTS, event);
}
