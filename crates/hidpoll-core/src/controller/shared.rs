// Hidpoll Shared Controller
// One lock per controller serializing polls, reads and drains across threads

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::{Controller, PollResult};
use crate::event::Event;
use crate::Identifier;

/// Thread-safe handle to a controller.
///
/// A controller's components, queue and poll cycle form one unit of mutual
/// exclusion: every method takes the lock once and holds it for the whole
/// operation, so a drain never observes a half-finished poll.
#[derive(Debug, Clone)]
pub struct SharedController {
    inner: Arc<Mutex<Controller>>,
}

impl SharedController {
    pub fn new(controller: Controller) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    pub fn name(&self) -> String {
        self.inner.lock().name().to_string()
    }

    /// Run one poll cycle under the lock
    pub fn poll(&self) -> PollResult<()> {
        self.inner.lock().poll()
    }

    pub fn read(&self, identifier: Identifier) -> Option<f32> {
        self.inner.lock().read(identifier)
    }

    pub fn drain_event(&self) -> Option<Event> {
        self.inner.lock().drain_event()
    }

    /// Drain every queued event into `out`, oldest first
    pub fn drain_into(&self, out: &mut Vec<Event>) -> usize {
        let mut controller = self.inner.lock();
        let before = out.len();
        out.extend(std::iter::from_fn(|| controller.drain_event()));
        out.len() - before
    }

    pub fn set_queue_capacity(&self, capacity: usize) -> PollResult<()> {
        self.inner.lock().set_queue_capacity(capacity)
    }

    /// Hold the lock for a longer sequence of operations
    pub fn lock(&self) -> MutexGuard<'_, Controller> {
        self.inner.lock()
    }
}

impl From<Controller> for SharedController {
    fn from(controller: Controller) -> Self {
        Self::new(controller)
    }
}
