// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Errors the core can report back to its caller. These never cross the
//! bus -- wire-visible failure is communicated with a `LONG_ACK`, handled
//! entirely inside [`crate::lncv`].

use core::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CoreError {
    /// The transmit queue's slot pool is exhausted.
    QueueFull,
    /// The config store has never been formatted; reads return no value.
    StoreUninitialized,
    /// The config store rejected a write.
    StoreFailure,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CoreError::QueueFull => "transmit queue pool exhausted",
            CoreError::StoreUninitialized => "config store has not been formatted",
            CoreError::StoreFailure => "config store write failed",
        })
    }
}
