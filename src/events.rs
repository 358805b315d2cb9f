//! Block → scheduler notifications.
//!
//! The block pushes these onto a lock-free SPSC queue from inside `work`; the
//! scheduler drains the queue between calls. The most important one is
//! [`BlockEvent::CapacityLimitDiscovered`]: a kernel build found that the
//! constant-memory budget holds fewer items than the scheduler's batch hint.
//!
//! All events are `Copy` and carry no heap data, so publishing never allocates.
//! A full queue drops the event rather than blocking the streaming thread. The
//! last [`RESERVED_SLOTS`] slots only take capacity limits, so a backlog of
//! informational events never crowds one out. The block's own
//! `max_output_items()` stays authoritative either way.

use crate::kernel::MemoryRegime;
use rtrb::{Consumer, Producer, RingBuffer};

/// Capacity for the block event queue.
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// Slots kept free for [`BlockEvent::CapacityLimitDiscovered`].
pub const RESERVED_SLOTS: usize = 1;

/// Creates a new event queue pair.
///
/// Returns (producer for the block, consumer for the scheduler).
pub fn new_event_queue() -> (Producer<BlockEvent>, Consumer<BlockEvent>) {
    RingBuffer::new(EVENT_QUEUE_CAPACITY)
}

/// Notifications sent from a block to its scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEvent {
    /// The scheduler should not request batches larger than `limit`.
    CapacityLimitDiscovered {
        limit: usize,
    },

    /// Device buffers were (re)provisioned and the kernel rebuilt.
    KernelRebuilt {
        items: usize,
        regime: MemoryRegime,
    },

    /// Device buffers and kernel were released.
    BuffersReleased,
}

impl BlockEvent {
    /// Events the scheduler must act on rather than merely observe.
    pub fn is_critical(&self) -> bool {
        matches!(self, BlockEvent::CapacityLimitDiscovered { .. })
    }

    /// Returns a human-readable description (for debugging).
    pub fn description(&self) -> &'static str {
        match self {
            BlockEvent::CapacityLimitDiscovered { .. } => "CapacityLimitDiscovered",
            BlockEvent::KernelRebuilt { .. } => "KernelRebuilt",
            BlockEvent::BuffersReleased => "BuffersReleased",
        }
    }
}

/// Publish an event; dropped silently if the queue is full.
///
/// Informational events are also dropped once only the reserved slots remain.
#[inline]
pub fn publish(tx: &mut Producer<BlockEvent>, event: BlockEvent) {
    if !event.is_critical() && tx.slots() <= RESERVED_SLOTS {
        return;
    }
    let _ = tx.push(event);
}

/// Drains all pending events.
pub fn drain_events(rx: &mut Consumer<BlockEvent>) -> Vec<BlockEvent> {
    let mut events = Vec::with_capacity(rx.slots());
    while let Ok(event) = rx.pop() {
        events.push(event);
    }
    events
}
