// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Priority-ordered transmit queue with starvation avoidance.
//!
//! Queued (not-yet-dequeued) messages live in a fixed pool of slots linked
//! into one ascending-priority list, in place of the original firmware's
//! `malloc`/`free` linked list -- a bounded pool means `enqueue` has a
//! predictable failure mode (`CoreError::QueueFull`) instead of an
//! allocator that can fail anywhere.

use crate::diagnostics::{self, QueueEvent};
use crate::error::CoreError;
use crate::message::OutboundMessage;

/// Number of messages the queue can hold at once, not counting the one
/// currently on the wire.
pub const POOL_SIZE: usize = 8;

static_assertions::const_assert!(POOL_SIZE > 0);

struct Slot {
    message: Option<OutboundMessage>,
    next: Option<usize>,
}

pub struct TxQueue {
    slots: [Slot; POOL_SIZE],
    head: Option<usize>,
    free: Option<usize>,
}

impl TxQueue {
    pub fn new() -> Self {
        let mut slots = core::array::from_fn(|_| Slot { message: None, next: None });
        for i in 0..POOL_SIZE {
            slots[i].next = if i + 1 < POOL_SIZE { Some(i + 1) } else { None };
        }
        Self { slots, head: None, free: Some(0) }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Inserts `message` ahead of every queued message of equal or lower
    /// priority, bumping each priority-`P+1` message it passes over down
    /// to `P` and aging every message already behind the insertion point
    /// down by one step, so a low-priority message is never starved
    /// forever by a steady stream of higher-priority arrivals.
    pub fn enqueue(&mut self, message: OutboundMessage) -> Result<(), CoreError> {
        let priority = message.priority;
        let new_idx = self.alloc(message)?;

        let mut prev: Option<usize> = None;
        let mut cur = self.head;

        while let Some(idx) = cur {
            let p = self.slots[idx].message.as_ref().unwrap().priority;
            if p <= priority {
                prev = cur;
                cur = self.slots[idx].next;
            } else {
                break;
            }
        }

        while let Some(idx) = cur {
            let p = self.slots[idx].message.as_ref().unwrap().priority;
            if p == priority.saturating_add(1) {
                self.slots[idx].message.as_mut().unwrap().priority = p.saturating_sub(1);
                prev = cur;
                cur = self.slots[idx].next;
            } else {
                break;
            }
        }

        self.slots[new_idx].next = cur;
        match prev {
            Some(p) => self.slots[p].next = Some(new_idx),
            None => self.head = Some(new_idx),
        }

        let mut walk = cur;
        while let Some(idx) = walk {
            let m = self.slots[idx].message.as_mut().unwrap();
            m.priority = m.priority.saturating_sub(1);
            walk = self.slots[idx].next;
        }

        Ok(())
    }

    /// Removes the message at the head of the queue -- the one the access
    /// state machine should dequeue and drive onto the wire next.
    pub fn dequeue(&mut self) -> Option<OutboundMessage> {
        let idx = self.head?;
        self.head = self.slots[idx].next;
        let message = self.slots[idx].message.take();
        self.free_slot(idx);
        message
    }

    /// Pushes a message straight back to the head of the queue, bypassing
    /// the priority/aging algorithm above. Used only to recover a message
    /// a collision interrupted mid-transmission: it must go out again
    /// before anything else, at whatever priority it already had.
    pub fn requeue_head(&mut self, mut message: OutboundMessage) -> Result<(), CoreError> {
        message.reset_indices();
        let idx = self.alloc(message)?;
        self.slots[idx].next = self.head;
        self.head = Some(idx);
        Ok(())
    }

    fn alloc(&mut self, message: OutboundMessage) -> Result<usize, CoreError> {
        let idx = self.free.ok_or(CoreError::QueueFull).inspect_err(|_| {
            diagnostics::record_queue(QueueEvent::Full);
        })?;
        self.free = self.slots[idx].next;
        self.slots[idx].message = Some(message);
        self.slots[idx].next = None;
        Ok(idx)
    }

    fn free_slot(&mut self, idx: usize) {
        self.slots[idx].message = None;
        self.slots[idx].next = self.free;
        self.free = Some(idx);
    }
}

impl Default for TxQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageBuilder;

    fn msg(priority: u8) -> OutboundMessage {
        MessageBuilder::two(0x85, priority)
    }

    #[test]
    fn dequeues_in_priority_order() {
        let mut q = TxQueue::new();
        q.enqueue(msg(1)).unwrap();
        q.enqueue(msg(5)).unwrap();
        // Enqueuing priority 3 skips over the priority-1 message (more
        // urgent), then inserts ahead of the priority-5 message, aging it
        // down to 4 as a remaining successor.
        q.enqueue(msg(3)).unwrap();
        assert_eq!(q.dequeue().unwrap().priority, 1);
        assert_eq!(q.dequeue().unwrap().priority, 3);
        assert_eq!(q.dequeue().unwrap().priority, 4);
        assert!(q.dequeue().is_none());
    }

    #[test]
    fn equal_priority_is_fifo() {
        let mut q = TxQueue::new();
        let mut a = msg(4);
        a.tx_index = 11; // tag to tell the two apart below
        q.enqueue(a).unwrap();
        q.enqueue(msg(4)).unwrap();
        assert_eq!(q.dequeue().unwrap().tx_index, 11);
    }

    #[test]
    fn low_priority_message_is_aged_toward_the_front() {
        let mut q = TxQueue::new();
        // Five priority-8 arrivals; tag the first to track it through
        // the aging below.
        let mut tagged = msg(8);
        tagged.tx_index = 99;
        q.enqueue(tagged).unwrap();
        for _ in 0..4 {
            q.enqueue(msg(8)).unwrap();
        }

        // Three higher-urgency arrivals are each inserted ahead of the
        // priority-8 messages, aging every one of them down by one step
        // per insertion (matching the starvation-avoidance scenario:
        // a run of urgent arrivals still leaves older messages reachable).
        for _ in 0..3 {
            q.enqueue(msg(3)).unwrap();
        }
        for _ in 0..3 {
            assert_eq!(q.dequeue().unwrap().priority, 3);
        }

        // A fresh priority-8 arrival after the fact never gets aged.
        q.enqueue(msg(8)).unwrap();

        // The tagged message aged from 8 down to 5 over the three
        // insertions above, so it dequeues ahead of the late arrival
        // that starts at the same original priority but was never aged.
        let next = q.dequeue().unwrap();
        assert_eq!(next.tx_index, 99);
        assert_eq!(next.priority, 5);
    }

    #[test]
    fn pool_exhaustion_reports_queue_full() {
        let mut q = TxQueue::new();
        for _ in 0..POOL_SIZE {
            q.enqueue(msg(1)).unwrap();
        }
        assert_eq!(q.enqueue(msg(1)), Err(CoreError::QueueFull));
    }

    #[test]
    fn requeue_head_bypasses_priority_order() {
        let mut q = TxQueue::new();
        q.enqueue(msg(10)).unwrap();
        q.requeue_head(msg(0)).unwrap();
        assert_eq!(q.dequeue().unwrap().priority, 0);
    }
}
