// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ring buffer for debugging the Loconet core.
//!
//! This crate has nothing to do with the link-layer `RingBuffer` of bytes
//! defined in `loconet-wire`. It is a *diagnostic* history: a fixed-size,
//! de-duplicating record of recent events (access-machine transitions, queue
//! re-orders, LNCV and fast-clock activity) that can be inspected with a
//! debugger without attaching a logger. Nothing in the core depends on its
//! contents; recording an entry can never change behaviour.
//!
//! ## Creating a diagnostic ring buffer
//!
//! ```
//! use loconet_ringbuf::diag_ringbuf;
//!
//! #[derive(Copy, Clone, PartialEq, Debug, Default)]
//! enum Event {
//!     #[default]
//!     None,
//!     Woke,
//! }
//!
//! diag_ringbuf!(EVENTS, Event, 8, Event::None);
//! ```
//!
//! Entries are recorded with [`diag_entry!`]:
//!
//! ```
//! # use loconet_ringbuf::{diag_ringbuf, diag_entry};
//! # #[derive(Copy, Clone, PartialEq, Debug, Default)]
//! # enum Event { #[default] None, Woke }
//! # diag_ringbuf!(EVENTS, Event, 8, Event::None);
//! diag_entry!(EVENTS, Event::Woke);
//! ```
//!
//! Consecutive identical entries are collapsed into one slot plus a
//! saturating repeat count, so a noisy event (e.g. repeated framing errors)
//! does not evict the history that led up to it.

#![cfg_attr(not(test), no_std)]

use core::cell::Cell;
use core::mem::MaybeUninit;

/// One recorded occurrence, plus how many times it repeated back-to-back.
#[derive(Copy, Clone, Debug)]
pub struct Entry<T: Copy> {
    pub payload: T,
    pub count: u32,
}

/// A fixed-capacity, de-duplicating history of the last `N` distinct runs of
/// events.
///
/// `DiagRingbuf` is only safe to share as a `static` because every access
/// goes through `&self` with interior mutability via `Cell`; callers are
/// responsible for the same single-threaded discipline the rest of this
/// crate relies on (see the core's concurrency notes) -- there is no locking
/// here.
pub struct DiagRingbuf<T: Copy, const N: usize> {
    entries: [Cell<Entry<T>>; N],
    next: Cell<usize>,
    last: Cell<Option<usize>>,
}

impl<T: Copy + PartialEq, const N: usize> DiagRingbuf<T, N> {
    pub const fn new(init: T) -> Self {
        // `[const { .. }; N]` can't close over `init` here since it is a
        // runtime parameter of this const fn, not itself a const; build the
        // array by hand instead.
        let mut entries: [MaybeUninit<Cell<Entry<T>>>; N] =
            unsafe { MaybeUninit::uninit().assume_init() };
        let mut i = 0;
        while i < N {
            entries[i] = MaybeUninit::new(Cell::new(Entry { payload: init, count: 0 }));
            i += 1;
        }
        let entries = unsafe { core::mem::transmute_copy::<_, [Cell<Entry<T>>; N]>(&entries) };
        Self {
            entries,
            next: Cell::new(0),
            last: Cell::new(None),
        }
    }

    /// Records `payload`, collapsing into the previous entry if it is equal.
    pub fn record(&self, payload: T) {
        if let Some(last) = self.last.get() {
            let mut entry = self.entries[last].get();
            if entry.payload == payload {
                entry.count = entry.count.saturating_add(1);
                self.entries[last].set(entry);
                return;
            }
        }

        let slot = self.next.get();
        self.entries[slot].set(Entry { payload, count: 1 });
        self.last.set(Some(slot));
        self.next.set((slot + 1) % N);
    }

    /// Returns the most recently recorded entry, if any.
    pub fn last(&self) -> Option<Entry<T>> {
        self.last.get().map(|i| self.entries[i].get())
    }

    /// Snapshots all occupied slots, oldest first. Intended for tests and
    /// off-target inspection, not for use from an interrupt handler.
    pub fn snapshot(&self) -> heapless::Vec<Entry<T>, N>
    where
        T: Default,
    {
        let mut out = heapless::Vec::new();
        let start = self.next.get();
        for i in 0..N {
            let idx = (start + i) % N;
            let entry = self.entries[idx].get();
            if entry.count > 0 {
                let _ = out.push(entry);
            }
        }
        out
    }
}

// Safety: `DiagRingbuf` is `Sync` so it can live in a `static`, but every
// method requires the caller to uphold the single-writer-at-a-time
// discipline documented on the type. This mirrors the teacher crate's
// `StaticCell`-backed ring buffer, minus the borrow-flag bookkeeping, since
// this crate never hands out a `&mut` into the buffer.
unsafe impl<T: Copy, const N: usize> Sync for DiagRingbuf<T, N> {}

/// Declares a diagnostic ring buffer in the current module.
///
/// `diag_ringbuf!(NAME, Type, N, init)` declares `static NAME:
/// DiagRingbuf<Type, N>` with every slot initialized to `init`.
#[macro_export]
macro_rules! diag_ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        static $name: $crate::DiagRingbuf<$t, $n> = $crate::DiagRingbuf::new($init);
    };
}

/// Records an entry in a ring buffer declared with [`diag_ringbuf!`].
///
/// Compiles to nothing under the `diagnostics-disabled` feature.
#[macro_export]
macro_rules! diag_entry {
    ($name:ident, $payload:expr) => {
        #[cfg(not(feature = "diagnostics-disabled"))]
        {
            $name.record($payload);
        }
        #[cfg(feature = "diagnostics-disabled")]
        {
            let _ = &$payload;
        }
    };
}
