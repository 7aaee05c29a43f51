// Hidpoll Polling Engine
// Per-cycle reconciliation of raw device samples into component state and events

use crate::backend::{BackendError, RawEvent, RawTarget};
use crate::event::{Event, EventQueue};
use crate::Identifier;

use super::Controller;

/// Result type for polling operations
pub type PollResult<T> = Result<T, PollError>;

/// Errors that cross the polling boundary.
///
/// Queue overrun, unknown components and anomalous hat values are absorbed
/// by the engine and never show up here.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Failed to poll device {controller}: {source}")]
    Backend {
        controller: String,
        #[source]
        source: BackendError,
    },

    #[error("Failed to create new event queue of size {capacity} for {controller}: {source}")]
    QueueResize {
        controller: String,
        capacity: usize,
        #[source]
        source: BackendError,
    },
}

impl PollError {
    fn backend(controller: &str, source: BackendError) -> Self {
        PollError::Backend {
            controller: controller.to_string(),
            source,
        }
    }

    /// Name of the controller that failed
    pub fn controller(&self) -> &str {
        match self {
            PollError::Backend { controller, .. } => controller,
            PollError::QueueResize { controller, .. } => controller,
        }
    }
}

/// What happened to the raw events of one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Raw events fetched from the backend
    pub raw: usize,
    /// Events pushed onto the queue
    pub enqueued: usize,
    /// Events refused by a full queue
    pub dropped: usize,
    /// Zero relative deltas and unchanged absolute values
    pub suppressed: usize,
    /// Raw events naming a component this controller does not have
    pub unknown: usize,
}

impl Controller {
    /// Run one reconciliation cycle.
    ///
    /// Drains every raw event the backend has buffered, updates cached
    /// component values and queues the observable changes. Never waits for
    /// new input. On a backend failure the cycle stops where it is: events
    /// applied before the failure stay applied, nothing after it is.
    pub fn poll(&mut self) -> PollResult<()> {
        self.last_cycle = Default::default();
        let result = self.run_cycle();
        match &result {
            Ok(()) => log::trace!("Polled {}: {:?}", self.name, self.last_cycle),
            Err(e) => log::debug!("{}", e),
        }
        result
    }

    fn run_cycle(&mut self) -> PollResult<()> {
        self.backend
            .pre_poll()
            .map_err(|source| PollError::backend(&self.name, source))?;

        for component in &mut self.components {
            component.begin_cycle();
        }

        // One scratch event serves the whole cycle; the queue keeps copies.
        let mut scratch = Event::default();
        while let Some(raw) = self
            .backend
            .next_raw_event()
            .map_err(|source| PollError::backend(&self.name, source))?
        {
            self.last_cycle.raw += 1;
            self.apply(&raw, &mut scratch);
        }
        Ok(())
    }

    fn apply(&mut self, raw: &RawEvent, scratch: &mut Event) {
        let Some((index, value)) = self.resolve(raw) else {
            log::trace!("{}: ignoring event for unknown {:?}", self.name, raw.target);
            self.last_cycle.unknown += 1;
            return;
        };

        let component = &mut self.components[index];
        let Some(published) = component.accept(value) else {
            self.last_cycle.suppressed += 1;
            return;
        };

        let identifier = component.identifier();
        scratch.set(index, identifier, published, raw.nanos);
        if self.queue.push(scratch) {
            self.last_cycle.enqueued += 1;
        } else {
            log::trace!("{}: event queue full, dropping {}", self.name, identifier);
            self.last_cycle.dropped += 1;
        }
    }

    /// Map a raw event to a component position and the value to fold in
    fn resolve(&mut self, raw: &RawEvent) -> Option<(usize, f32)> {
        match raw.target {
            RawTarget::Component(identifier) => {
                let index = self.component_index(identifier)?;
                Some((index, raw.value))
            }
            RawTarget::HatAxis { pov, axis } => {
                let index = self.component_index(pov)?;
                let hat = self
                    .hats
                    .iter_mut()
                    .find(|hat| hat.component_index() == index)?;
                Some((index, hat.update(axis, raw.value).value()))
            }
        }
    }

    /// Poll this controller and every descendant, each independently.
    ///
    /// A failing node does not stop the others; the first error is
    /// returned once all have been polled.
    pub fn poll_tree(&mut self) -> PollResult<()> {
        let mut first_error = self.poll().err();
        for child in &mut self.children {
            if let Err(e) = child.poll_tree() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Current value of the component carrying `identifier`.
    ///
    /// An absolute component that has seen neither an event nor a sample
    /// this cycle is sampled from the backend first. Hats are never
    /// sampled; their value only comes from synthesized axis events.
    /// Returns `None` only when the controller has no such component.
    pub fn read(&mut self, identifier: Identifier) -> Option<f32> {
        let index = self.component_index(identifier)?;
        let synthesized = self.hats.iter().any(|hat| hat.component_index() == index);
        let component = &mut self.components[index];
        if synthesized {
            component.mark_polled();
        } else if !component.is_relative() && !component.has_polled() {
            match self.backend.sample(identifier) {
                Ok(Some(value)) => component.store_sample(value),
                Ok(None) => component.mark_polled(),
                Err(e) => {
                    log::warn!("{}: failed to sample {}: {}", self.name, identifier, e);
                    component.mark_polled();
                }
            }
        }
        Some(component.value())
    }

    /// Cached value without touching the backend
    pub fn value(&self, identifier: Identifier) -> Option<f32> {
        self.find(identifier).map(|component| component.value())
    }

    /// Remove the oldest queued event
    pub fn drain_event(&mut self) -> Option<Event> {
        self.queue.pop()
    }

    /// Copy the oldest queued event into `out`; `false` when empty
    pub fn drain_event_into(&mut self, out: &mut Event) -> bool {
        self.queue.pop_into(out)
    }

    /// Replace the event queue with an empty one of `capacity` slots.
    ///
    /// Undelivered events are discarded. The backend is told first; if it
    /// refuses, the old queue and its contents are kept.
    pub fn set_queue_capacity(&mut self, capacity: usize) -> PollResult<()> {
        if let Err(source) = self.backend.set_queue_capacity(capacity) {
            let error = PollError::QueueResize {
                controller: self.name.clone(),
                capacity,
                source,
            };
            log::warn!("{}", error);
            return Err(error);
        }
        let discarded = self.queue.len();
        self.queue = EventQueue::new(capacity);
        log::debug!(
            "{}: event queue resized to {}, {} undelivered events discarded",
            self.name,
            capacity,
            discarded
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ScriptedBackend, ScriptedFeed};
    use crate::identifier::{axis, button};
    use crate::pov::{HatAxis, PovDirection};
    use crate::Component;

    fn mouse(capacity: usize) -> (Controller, ScriptedFeed) {
        let (backend, feed) = ScriptedBackend::new();
        let controller = Controller::builder("Mouse")
            .component(Component::relative_axis("X", axis::X))
            .component(Component::relative_axis("Y", axis::Y))
            .component(Component::new("Left", button::LEFT))
            .queue_capacity(capacity)
            .backend(backend)
            .build();
        (controller, feed)
    }

    fn drained_values(controller: &mut Controller) -> Vec<f32> {
        std::iter::from_fn(|| controller.drain_event())
            .map(|e| e.value())
            .collect()
    }

    #[test]
    fn test_relative_accumulation_within_cycle() {
        let (mut controller, feed) = mouse(8);
        feed.extend([1.0, 2.0, 3.0].map(|d| RawEvent::component(axis::X, d, 0)));
        controller.poll().unwrap();
        assert_eq!(drained_values(&mut controller), vec![1.0, 3.0, 6.0]);
        assert_eq!(controller.value(axis::X), Some(6.0));
    }

    #[test]
    fn test_zero_relative_delta_is_not_queued() {
        let (mut controller, feed) = mouse(8);
        feed.extend([1.0, 0.0, 2.0].map(|d| RawEvent::component(axis::X, d, 0)));
        controller.poll().unwrap();
        assert_eq!(drained_values(&mut controller), vec![1.0, 3.0]);
        assert_eq!(controller.last_cycle().suppressed, 1);
    }

    #[test]
    fn test_relative_reset_each_cycle() {
        let (mut controller, feed) = mouse(8);
        feed.push(RawEvent::component(axis::X, 5.0, 0));
        controller.poll().unwrap();
        assert_eq!(controller.read(axis::X), Some(5.0));

        controller.poll().unwrap();
        assert_eq!(controller.read(axis::X), Some(0.0));
    }

    #[test]
    fn test_absolute_duplicate_suppression() {
        let (backend, feed) = ScriptedBackend::new();
        let mut controller = Controller::builder("Stick")
            .component(Component::absolute_axis("X", axis::X).with_initial_value(0.5))
            .backend(backend)
            .build();

        feed.push(RawEvent::component(axis::X, 0.5, 1));
        controller.poll().unwrap();
        assert!(controller.event_queue().is_empty());

        feed.push(RawEvent::component(axis::X, 0.7, 2));
        controller.poll().unwrap();
        let event = controller.drain_event().unwrap();
        assert_eq!(event.value(), 0.7);
        assert_eq!(event.nanos(), 2);
        assert_eq!(event.identifier(), axis::X);
        assert!(controller.drain_event().is_none());
        assert_eq!(controller.value(axis::X), Some(0.7));
    }

    #[test]
    fn test_absolute_value_persists_across_cycles() {
        let (mut controller, feed) = mouse(8);
        feed.push(RawEvent::component(button::LEFT, 1.0, 0));
        controller.poll().unwrap();
        controller.poll().unwrap();
        assert_eq!(controller.value(button::LEFT), Some(1.0));
    }

    #[test]
    fn test_overrun_drops_newest() {
        let (mut controller, feed) = mouse(2);
        feed.extend([1.0, 2.0, 3.0].map(|d| RawEvent::component(axis::X, d, 0)));
        controller.poll().unwrap();
        assert_eq!(controller.last_cycle().dropped, 1);
        assert_eq!(controller.event_queue().dropped(), 1);
        assert_eq!(drained_values(&mut controller), vec![1.0, 3.0]);
        assert_eq!(controller.read(axis::X), Some(6.0));
    }

    #[test]
    fn test_unknown_component_is_ignored() {
        let (mut controller, feed) = mouse(8);
        feed.push(RawEvent::component(axis::RZ, 1.0, 0));
        feed.push(RawEvent::component(axis::Y, 1.0, 0));
        controller.poll().unwrap();
        assert_eq!(controller.last_cycle().unknown, 1);
        assert_eq!(controller.last_cycle().enqueued, 1);
        assert_eq!(controller.drain_event().unwrap().identifier(), axis::Y);
    }

    #[test]
    fn test_event_component_index() {
        let (mut controller, feed) = mouse(8);
        feed.push(RawEvent::component(button::LEFT, 1.0, 0));
        controller.poll().unwrap();
        let event = controller.drain_event().unwrap();
        assert_eq!(controller.component(event.component()).unwrap().name(), "Left");
    }

    #[test]
    fn test_backend_failure_mid_drain() {
        let (mut controller, feed) = mouse(8);
        feed.push(RawEvent::component(axis::X, 1.0, 0));
        feed.push_failure("device unplugged");
        feed.push(RawEvent::component(axis::X, 2.0, 0));

        let err = controller.poll().unwrap_err();
        assert!(matches!(err, PollError::Backend { .. }));
        assert_eq!(err.controller(), "Mouse");
        assert_eq!(drained_values(&mut controller), vec![1.0]);
        assert_eq!(controller.value(axis::X), Some(1.0));
        assert_eq!(feed.pending(), 1);
    }

    #[test]
    fn test_pre_poll_failure_leaves_state_untouched() {
        let (mut controller, feed) = mouse(8);
        feed.push(RawEvent::component(axis::X, 4.0, 0));
        controller.poll().unwrap();

        feed.fail_next_pre_poll("stale");
        feed.push(RawEvent::component(axis::X, 1.0, 0));
        assert!(controller.poll().is_err());
        assert_eq!(controller.value(axis::X), Some(4.0));
        assert_eq!(drained_values(&mut controller), vec![4.0]);
        assert_eq!(feed.pre_poll_count(), 2);
    }

    #[test]
    fn test_lazy_absolute_sampling() {
        let (mut controller, feed) = mouse(8);
        feed.set_sample(button::LEFT, 1.0);
        controller.poll().unwrap();
        assert_eq!(feed.sample_count(), 0);

        assert_eq!(controller.read(button::LEFT), Some(1.0));
        assert_eq!(controller.read(button::LEFT), Some(1.0));
        assert_eq!(feed.sample_count(), 1);

        controller.poll().unwrap();
        controller.read(button::LEFT);
        assert_eq!(feed.sample_count(), 2);
    }

    #[test]
    fn test_event_marks_absolute_as_polled() {
        let (mut controller, feed) = mouse(8);
        feed.set_sample(button::LEFT, 0.0);
        feed.push(RawEvent::component(button::LEFT, 1.0, 0));
        controller.poll().unwrap();
        assert_eq!(controller.read(button::LEFT), Some(1.0));
        assert_eq!(feed.sample_count(), 0);
    }

    #[test]
    fn test_relative_read_never_samples() {
        let (mut controller, feed) = mouse(8);
        controller.poll().unwrap();
        controller.read(axis::X);
        assert_eq!(feed.sample_count(), 0);
        assert_eq!(controller.read(axis::RZ), None);
    }

    #[test]
    fn test_lazy_sample_does_not_swallow_next_event() {
        let (mut controller, feed) = mouse(8);
        feed.set_sample(button::LEFT, 1.0);
        controller.poll().unwrap();
        assert_eq!(controller.read(button::LEFT), Some(1.0));

        feed.push(RawEvent::component(button::LEFT, 1.0, 5));
        controller.poll().unwrap();
        assert_eq!(drained_values(&mut controller), vec![1.0]);
        assert_eq!(controller.last_cycle().suppressed, 0);
    }

    #[test]
    fn test_read_hat_never_samples_backend() {
        let (backend, feed) = ScriptedBackend::new();
        let mut controller = Controller::builder("Pad")
            .pov_hat(Component::new("Hat", axis::POV))
            .backend(backend)
            .build();

        feed.set_sample(axis::POV, 0.5);
        controller.poll().unwrap();
        assert_eq!(controller.read(axis::POV), Some(PovDirection::Center.value()));
        assert_eq!(feed.sample_count(), 0);

        feed.push(RawEvent::hat(axis::POV, HatAxis::X, -1.0, 1));
        controller.poll().unwrap();
        assert_eq!(controller.read(axis::POV), Some(PovDirection::Left.value()));
        assert_eq!(feed.sample_count(), 0);
    }

    #[test]
    fn test_pov_synthesis_through_poll() {
        let (backend, feed) = ScriptedBackend::new();
        let mut controller = Controller::builder("Pad")
            .pov_hat(Component::new("Hat", axis::POV))
            .backend(backend)
            .build();

        feed.push(RawEvent::hat(axis::POV, HatAxis::Y, -1.0, 1));
        feed.push(RawEvent::hat(axis::POV, HatAxis::X, 1.0, 2));
        // Re-reporting the same x must not produce a second event
        feed.push(RawEvent::hat(axis::POV, HatAxis::X, 1.0, 3));
        controller.poll().unwrap();

        assert_eq!(
            drained_values(&mut controller),
            vec![PovDirection::Up.value(), PovDirection::UpRight.value()]
        );
        assert_eq!(controller.last_cycle().suppressed, 1);
    }

    #[test]
    fn test_pov_anomaly_resolves_to_center() {
        let (backend, feed) = ScriptedBackend::new();
        let mut controller = Controller::builder("Pad")
            .pov_hat(Component::new("Hat", axis::POV))
            .backend(backend)
            .build();

        feed.push(RawEvent::hat(axis::POV, HatAxis::X, 1.0, 1));
        feed.push(RawEvent::hat(axis::POV, HatAxis::Y, 0.5, 2));
        controller.poll().unwrap();

        assert_eq!(
            drained_values(&mut controller),
            vec![PovDirection::Right.value(), PovDirection::Center.value()]
        );
        assert_eq!(controller.hat(axis::POV).unwrap().anomaly_count(), 1);
    }

    #[test]
    fn test_hat_event_for_plain_component_is_unknown() {
        let (mut controller, feed) = mouse(8);
        feed.push(RawEvent::hat(axis::X, HatAxis::X, 1.0, 0));
        controller.poll().unwrap();
        assert_eq!(controller.last_cycle().unknown, 1);
        assert!(controller.event_queue().is_empty());
    }

    #[test]
    fn test_set_queue_capacity_discards_events() {
        let (mut controller, feed) = mouse(8);
        feed.push(RawEvent::component(axis::X, 1.0, 0));
        controller.poll().unwrap();

        controller.set_queue_capacity(3).unwrap();
        assert_eq!(controller.event_queue().capacity(), 3);
        assert!(controller.drain_event().is_none());
        assert_eq!(feed.capacity_requests(), vec![3]);
    }

    #[test]
    fn test_set_queue_capacity_refused_keeps_queue() {
        let (mut controller, feed) = mouse(8);
        feed.push(RawEvent::component(axis::X, 1.0, 0));
        controller.poll().unwrap();

        feed.reject_capacity_changes(true);
        let err = controller.set_queue_capacity(3).unwrap_err();
        assert!(matches!(err, PollError::QueueResize { capacity: 3, .. }));
        assert_eq!(controller.event_queue().capacity(), 8);
        assert_eq!(drained_values(&mut controller), vec![1.0]);
    }

    #[test]
    fn test_drain_event_into() {
        let (mut controller, feed) = mouse(8);
        feed.push(RawEvent::component(axis::Y, -2.0, 7));
        controller.poll().unwrap();
        let mut out = Event::default();
        assert!(controller.drain_event_into(&mut out));
        assert_eq!(out.value(), -2.0);
        assert!(!controller.drain_event_into(&mut out));
    }

    #[test]
    fn test_poll_tree_polls_every_node() {
        let (left_backend, left_feed) = ScriptedBackend::new();
        let (right_backend, right_feed) = ScriptedBackend::new();
        let mut root = Controller::builder("Root")
            .child(
                Controller::builder("Left")
                    .component(Component::relative_axis("X", axis::X))
                    .backend(left_backend)
                    .build(),
            )
            .child(
                Controller::builder("Right")
                    .component(Component::relative_axis("X", axis::X))
                    .backend(right_backend)
                    .build(),
            )
            .build();

        left_feed.push_failure("gone");
        right_feed.push(RawEvent::component(axis::X, 2.0, 0));

        let err = root.poll_tree().unwrap_err();
        assert_eq!(err.controller(), "Left");
        assert_eq!(root.children_mut()[1].drain_event().unwrap().value(), 2.0);
    }
}
