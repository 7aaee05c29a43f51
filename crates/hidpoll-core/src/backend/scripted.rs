// Hidpoll Scripted Backend
// In-memory device backend fed by the caller, for tests and replays

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{BackendError, BackendResult, DeviceBackend, RawEvent};
use crate::Identifier;

#[derive(Debug)]
enum Step {
    Event(RawEvent),
    Fail(String),
}

#[derive(Debug, Default)]
struct FeedState {
    steps: VecDeque<Step>,
    samples: HashMap<Identifier, f32>,
    pre_poll_failure: Option<String>,
    reject_capacity: bool,
    pre_polls: usize,
    sample_requests: usize,
    capacity_requests: Vec<usize>,
}

/// Caller-side handle feeding a [`ScriptedBackend`].
///
/// The backend is moved into its controller; the feed stays with the caller
/// and shares state with it, so events can be queued between polls.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFeed {
    state: Arc<Mutex<FeedState>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend reading from this feed
    pub fn backend(&self) -> ScriptedBackend {
        ScriptedBackend {
            state: Arc::clone(&self.state),
        }
    }

    /// Queue a raw event for the next drain
    pub fn push(&self, event: RawEvent) {
        self.state.lock().steps.push_back(Step::Event(event));
    }

    /// Queue several raw events in order
    pub fn extend(&self, events: impl IntoIterator<Item = RawEvent>) {
        let mut state = self.state.lock();
        state.steps.extend(events.into_iter().map(Step::Event));
    }

    /// Queue an I/O failure; the drain reaching it fails the poll
    pub fn push_failure(&self, message: impl Into<String>) {
        self.state.lock().steps.push_back(Step::Fail(message.into()));
    }

    /// Make the next `pre_poll` fail once
    pub fn fail_next_pre_poll(&self, message: impl Into<String>) {
        self.state.lock().pre_poll_failure = Some(message.into());
    }

    /// Set the value returned when a component is sampled lazily
    pub fn set_sample(&self, identifier: Identifier, value: f32) {
        self.state.lock().samples.insert(identifier, value);
    }

    /// Refuse subsequent queue capacity changes
    pub fn reject_capacity_changes(&self, reject: bool) {
        self.state.lock().reject_capacity = reject;
    }

    /// Number of steps not yet consumed
    pub fn pending(&self) -> usize {
        self.state.lock().steps.len()
    }

    pub fn pre_poll_count(&self) -> usize {
        self.state.lock().pre_polls
    }

    pub fn sample_count(&self) -> usize {
        self.state.lock().sample_requests
    }

    /// Capacities requested through `set_queue_capacity`, in order
    pub fn capacity_requests(&self) -> Vec<usize> {
        self.state.lock().capacity_requests.clone()
    }
}

/// Device backend that replays whatever its [`ScriptedFeed`] holds
#[derive(Debug)]
pub struct ScriptedBackend {
    state: Arc<Mutex<FeedState>>,
}

impl ScriptedBackend {
    /// Create a backend together with the feed driving it
    pub fn new() -> (Self, ScriptedFeed) {
        let feed = ScriptedFeed::new();
        (feed.backend(), feed)
    }
}

fn io_failure(message: String) -> BackendError {
    BackendError::Io(io::Error::new(io::ErrorKind::Other, message))
}

impl DeviceBackend for ScriptedBackend {
    fn pre_poll(&mut self) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.pre_polls += 1;
        match state.pre_poll_failure.take() {
            Some(message) => Err(io_failure(message)),
            None => Ok(()),
        }
    }

    fn next_raw_event(&mut self) -> BackendResult<Option<RawEvent>> {
        match self.state.lock().steps.pop_front() {
            Some(Step::Event(event)) => Ok(Some(event)),
            Some(Step::Fail(message)) => Err(io_failure(message)),
            None => Ok(None),
        }
    }

    fn sample(&mut self, identifier: Identifier) -> BackendResult<Option<f32>> {
        let mut state = self.state.lock();
        state.sample_requests += 1;
        Ok(state.samples.get(&identifier).copied())
    }

    fn set_queue_capacity(&mut self, capacity: usize) -> BackendResult<()> {
        let mut state = self.state.lock();
        if state.reject_capacity {
            return Err(BackendError::Unsupported(format!(
                "queue capacity {} rejected",
                capacity
            )));
        }
        state.capacity_requests.push(capacity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{axis, button};

    #[test]
    fn test_scripted_backend_replays_in_order() {
        let (mut backend, feed) = ScriptedBackend::new();
        feed.push(RawEvent::component(axis::X, 1.0, 1));
        feed.push(RawEvent::component(axis::Y, 2.0, 2));
        assert_eq!(feed.pending(), 2);

        let first = backend.next_raw_event().unwrap().unwrap();
        assert_eq!(first.value, 1.0);
        let second = backend.next_raw_event().unwrap().unwrap();
        assert_eq!(second.value, 2.0);
        assert!(backend.next_raw_event().unwrap().is_none());
    }

    #[test]
    fn test_scripted_backend_failure_step() {
        let (mut backend, feed) = ScriptedBackend::new();
        feed.push_failure("unplugged");
        feed.push(RawEvent::component(axis::X, 1.0, 1));

        assert!(matches!(backend.next_raw_event(), Err(BackendError::Io(_))));
        assert!(backend.next_raw_event().unwrap().is_some());
    }

    #[test]
    fn test_scripted_backend_pre_poll_failure_is_one_shot() {
        let (mut backend, feed) = ScriptedBackend::new();
        feed.fail_next_pre_poll("stale handle");
        assert!(backend.pre_poll().is_err());
        assert!(backend.pre_poll().is_ok());
        assert_eq!(feed.pre_poll_count(), 2);
    }

    #[test]
    fn test_scripted_backend_samples() {
        let (mut backend, feed) = ScriptedBackend::new();
        feed.set_sample(button::TRIGGER, 1.0);
        assert_eq!(backend.sample(button::TRIGGER).unwrap(), Some(1.0));
        assert_eq!(backend.sample(button::THUMB).unwrap(), None);
        assert_eq!(feed.sample_count(), 2);
    }

    #[test]
    fn test_scripted_backend_capacity_requests() {
        let (mut backend, feed) = ScriptedBackend::new();
        backend.set_queue_capacity(8).unwrap();
        feed.reject_capacity_changes(true);
        assert!(backend.set_queue_capacity(16).is_err());
        assert_eq!(feed.capacity_requests(), vec![8]);
    }
}
