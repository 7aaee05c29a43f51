// Hidpoll Events
// Immutable (component, value, timestamp) records and the bounded queue holding them

pub mod queue;

pub use queue::{queue_config, EventQueue};

use crate::Identifier;

/// A change observed on one component during a poll cycle.
///
/// Events are plain values: the queue stores copies, so nothing produced
/// during a poll outlives it by reference. `component` indexes the owning
/// controller's component list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    component: usize,
    identifier: Identifier,
    value: f32,
    nanos: u64,
}

impl Event {
    pub fn new(component: usize, identifier: Identifier, value: f32, nanos: u64) -> Self {
        Self {
            component,
            identifier,
            value,
            nanos,
        }
    }

    /// Overwrite every field in place
    pub fn set(&mut self, component: usize, identifier: Identifier, value: f32, nanos: u64) {
        self.component = component;
        self.identifier = identifier;
        self.value = value;
        self.nanos = nanos;
    }

    /// Index of the component within its controller
    pub fn component(&self) -> usize {
        self.component
    }

    pub fn identifier(&self) -> Identifier {
        self.identifier
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Device timestamp in nanoseconds
    pub fn nanos(&self) -> u64 {
        self.nanos
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new(0, crate::identifier::axis::UNKNOWN, 0.0, 0)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Event: component = {}, value = {}, nanos = {}",
            self.identifier, self.value, self.nanos
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::axis;

    #[test]
    fn test_event_set_overwrites() {
        let mut event = Event::default();
        event.set(2, axis::Y, 0.5, 99);
        assert_eq!(event, Event::new(2, axis::Y, 0.5, 99));
    }

    #[test]
    fn test_event_display() {
        let event = Event::new(0, axis::X, 1.0, 10);
        assert_eq!(
            event.to_string(),
            "Event: component = axis:x, value = 1, nanos = 10"
        );
    }
}
