// Hidpoll Event Queue
// Fixed-capacity FIFO ring buffer with drop-on-full semantics

use super::Event;

/// Bounded FIFO of events.
///
/// All `capacity` slots are allocated up front; `push` and `pop_into` only
/// copy values in and out. A full queue refuses new events instead of
/// overwriting old ones, so under overrun the newest events are the ones
/// lost.
#[derive(Debug, Clone)]
pub struct EventQueue {
    slots: Box<[Event]>,
    head: usize,
    count: usize,
    dropped: u64,
}

impl EventQueue {
    /// Create an empty queue holding at most `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Event::default(); capacity].into_boxed_slice(),
            head: 0,
            count: 0,
            dropped: 0,
        }
    }

    /// Copy an event into the next free slot.
    ///
    /// Returns `false` and leaves the queue unchanged when it is full.
    pub fn push(&mut self, event: &Event) -> bool {
        if self.is_full() {
            self.dropped += 1;
            return false;
        }
        let tail = (self.head + self.count) % self.slots.len();
        self.slots[tail] = *event;
        self.count += 1;
        true
    }

    /// Copy the oldest event into `out` and remove it.
    ///
    /// Returns `false` and leaves `out` untouched when the queue is empty.
    pub fn pop_into(&mut self, out: &mut Event) -> bool {
        if self.is_empty() {
            return false;
        }
        *out = self.slots[self.head];
        self.head = (self.head + 1) % self.slots.len();
        self.count -= 1;
        true
    }

    /// Remove and return the oldest event
    pub fn pop(&mut self) -> Option<Event> {
        let mut event = Event::default();
        self.pop_into(&mut event).then_some(event)
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    /// Total events refused because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Iterate over queued events, oldest first, without removing them
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        (0..self.count).map(move |i| &self.slots[(self.head + i) % self.slots.len()])
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(queue_config::DEFAULT_CAPACITY)
    }
}

/// Queue sizing configuration
pub mod queue_config {
    /// Default number of events a controller buffers between drains
    pub const DEFAULT_CAPACITY: usize = 32;
}
