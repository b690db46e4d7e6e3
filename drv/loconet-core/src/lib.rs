// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Everything a Loconet accessory node needs above the wire-level framing
//! in `loconet-wire`: bus access arbitration, the transmit queue, LNCV
//! peer-programming, and fast-clock time distribution, all driven through
//! a [`Transport`]/[`ConfigStore`] pair supplied by the hosting driver task.

#![cfg_attr(not(test), no_std)]

mod access;
mod config;
mod core;
mod diagnostics;
mod dispatch;
mod error;
mod fastclock;
mod lncv;
mod message;
mod msb7;
mod transport;
mod txqueue;

pub use access::{AccessStateMachine, EchoResult, State};
pub use config::{BusConfig, FastClockMode};
pub use core::LoconetCore;
pub use error::CoreError;
pub use fastclock::{ClockTime, FastClock};
pub use lncv::{AckCode, LncvEngine, LncvMessage};
pub use message::{MessageBuilder, OutboundMessage};
pub use transport::{ConfigStore, EventMask, Handlers, Transport};
pub use txqueue::TxQueue;
