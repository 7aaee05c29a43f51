// Hidpoll Device Backends
// The contract between native device glue and the polling engine

pub mod scripted;

pub use scripted::{ScriptedBackend, ScriptedFeed};

use crate::pov::HatAxis;
use crate::Identifier;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors a backend can report to the polling engine
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device disconnected: {0}")]
    Disconnected(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// What a raw device event refers to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawTarget {
    /// A component registered on the controller
    Component(Identifier),
    /// One raw axis of the hat whose synthesized component is `pov`
    HatAxis { pov: Identifier, axis: HatAxis },
}

/// One raw sample produced by a backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawEvent {
    pub target: RawTarget,
    pub value: f32,
    pub nanos: u64,
}

impl RawEvent {
    pub fn new(target: RawTarget, value: f32, nanos: u64) -> Self {
        Self {
            target,
            value,
            nanos,
        }
    }

    /// Raw event for a registered component
    pub fn component(identifier: Identifier, value: f32, nanos: u64) -> Self {
        Self::new(RawTarget::Component(identifier), value, nanos)
    }

    /// Raw event for one axis of a hat switch
    pub fn hat(pov: Identifier, axis: HatAxis, value: f32, nanos: u64) -> Self {
        Self::new(RawTarget::HatAxis { pov, axis }, value, nanos)
    }
}

/// Producer of raw samples for one controller.
///
/// Each OS integration implements this for its devices. Every method must
/// return promptly: `next_raw_event` reports `Ok(None)` once the events
/// already buffered for this cycle are exhausted instead of waiting for new
/// input.
pub trait DeviceBackend: Send {
    /// Refresh hardware state once per cycle, before events are drained
    fn pre_poll(&mut self) -> BackendResult<()> {
        Ok(())
    }

    /// Next buffered raw event, `Ok(None)` when none remain
    fn next_raw_event(&mut self) -> BackendResult<Option<RawEvent>>;

    /// Sample the instantaneous state of an absolute component.
    ///
    /// Called lazily when a consumer reads a component that has seen neither
    /// an event nor a sample this cycle. `Ok(None)` means the backend cannot
    /// sample it and the cached value stands.
    fn sample(&mut self, _identifier: Identifier) -> BackendResult<Option<f32>> {
        Ok(None)
    }

    /// Resize any device-side buffer to match a new event queue capacity
    fn set_queue_capacity(&mut self, _capacity: usize) -> BackendResult<()> {
        Ok(())
    }
}

/// Backend for controllers that never produce events, such as a pure
/// grouping node in a controller tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

impl DeviceBackend for NullBackend {
    fn next_raw_event(&mut self) -> BackendResult<Option<RawEvent>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::axis;

    #[test]
    fn test_null_backend_is_empty() {
        let mut backend = NullBackend;
        assert!(backend.pre_poll().is_ok());
        assert!(backend.next_raw_event().unwrap().is_none());
        assert!(backend.sample(axis::X).unwrap().is_none());
        assert!(backend.set_queue_capacity(8).is_ok());
    }

    #[test]
    fn test_raw_event_constructors() {
        let e = RawEvent::component(axis::X, 1.0, 5);
        assert_eq!(e.target, RawTarget::Component(axis::X));
        let h = RawEvent::hat(axis::POV, HatAxis::Y, -1.0, 6);
        assert_eq!(
            h.target,
            RawTarget::HatAxis {
                pov: axis::POV,
                axis: HatAxis::Y
            }
        );
    }

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::Disconnected("pad0".to_string());
        assert_eq!(err.to_string(), "Device disconnected: pad0");
    }
}
