// Hidpoll Component
// A single sampled control (axis, button, key) owned by a controller

use crate::Identifier;

/// A single control on a controller.
///
/// The cached value is written only by the polling engine. For a relative
/// component it holds the delta accumulated since the current poll cycle
/// started; for an absolute component it holds the last known state and
/// persists across cycles until it changes. Duplicate suppression compares
/// against the last value reported by an event, which lazy samples leave
/// alone, so a sampled state never swallows the event announcing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    name: String,
    identifier: Identifier,
    analog: bool,
    relative: bool,
    dead_zone: f32,
    value: f32,
    event_value: f32,
    polled: bool,
}

impl Component {
    /// Create a digital, absolute component with no dead zone
    pub fn new(name: impl Into<String>, identifier: Identifier) -> Self {
        Self {
            name: name.into(),
            identifier,
            analog: false,
            relative: false,
            dead_zone: 0.0,
            value: 0.0,
            event_value: 0.0,
            polled: false,
        }
    }

    /// Convenience for a relative analog axis such as a mouse axis
    pub fn relative_axis(name: impl Into<String>, identifier: Identifier) -> Self {
        Self::new(name, identifier).with_analog(true).with_relative(true)
    }

    /// Convenience for an absolute analog axis such as a stick axis
    pub fn absolute_axis(name: impl Into<String>, identifier: Identifier) -> Self {
        Self::new(name, identifier).with_analog(true)
    }

    pub fn with_analog(mut self, analog: bool) -> Self {
        self.analog = analog;
        self
    }

    pub fn with_relative(mut self, relative: bool) -> Self {
        self.relative = relative;
        self
    }

    /// Set the dead zone; negative values are clamped to zero
    pub fn with_dead_zone(mut self, dead_zone: f32) -> Self {
        self.dead_zone = dead_zone.max(0.0);
        self
    }

    /// Seed the cached value before the first poll
    pub fn with_initial_value(mut self, value: f32) -> Self {
        self.value = value;
        self.event_value = value;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identifier(&self) -> Identifier {
        self.identifier
    }

    pub fn is_analog(&self) -> bool {
        self.analog
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }

    pub fn dead_zone(&self) -> f32 {
        self.dead_zone
    }

    /// Current cached value, without sampling the device
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Whether an absolute component has been sampled or updated this cycle
    pub fn has_polled(&self) -> bool {
        self.polled
    }

    /// Treat values within the dead zone as zero.
    ///
    /// This is a consumer-side filter; the polling engine never applies it
    /// when deciding whether a value is an event.
    pub fn apply_dead_zone(&self, value: f32) -> f32 {
        if value.abs() <= self.dead_zone {
            0.0
        } else {
            value
        }
    }

    /// Cached value with the dead zone applied
    pub fn filtered_value(&self) -> f32 {
        self.apply_dead_zone(self.value)
    }

    /// Start a new poll cycle: relative deltas restart from zero, absolute
    /// state becomes eligible for lazy sampling again.
    pub(crate) fn begin_cycle(&mut self) {
        if self.relative {
            self.value = 0.0;
        } else {
            self.polled = false;
        }
    }

    /// Fold a raw value into the cached state.
    ///
    /// Returns the value to publish, or `None` when the raw value carries no
    /// observable change (a zero relative delta, or an absolute value equal
    /// to the last event value). Comparisons are exact.
    pub(crate) fn accept(&mut self, raw: f32) -> Option<f32> {
        if self.relative {
            if raw == 0.0 {
                return None;
            }
            self.value += raw;
        } else {
            self.polled = true;
            self.value = raw;
            if raw == self.event_value {
                return None;
            }
            self.event_value = raw;
        }
        Some(self.value)
    }

    /// Record a lazily sampled absolute value; the event value is untouched
    pub(crate) fn store_sample(&mut self, value: f32) {
        self.value = value;
        self.polled = true;
    }

    /// Stop asking the device for this component until the next cycle
    pub(crate) fn mark_polled(&mut self) {
        self.polled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{axis, button};

    #[test]
    fn test_component_defaults() {
        let c = Component::new("Trigger", button::TRIGGER);
        assert_eq!(c.name(), "Trigger");
        assert_eq!(c.identifier(), button::TRIGGER);
        assert!(!c.is_analog());
        assert!(!c.is_relative());
        assert_eq!(c.dead_zone(), 0.0);
        assert_eq!(c.value(), 0.0);
        assert!(!c.has_polled());
    }

    #[test]
    fn test_component_builders() {
        let c = Component::relative_axis("X", axis::X);
        assert!(c.is_analog() && c.is_relative());
        let c = Component::absolute_axis("RX", axis::RX).with_dead_zone(-1.0);
        assert!(c.is_analog() && !c.is_relative());
        assert_eq!(c.dead_zone(), 0.0);
    }

    #[test]
    fn test_dead_zone_filter() {
        let c = Component::absolute_axis("X", axis::X)
            .with_dead_zone(0.1)
            .with_initial_value(0.05);
        assert_eq!(c.filtered_value(), 0.0);
        assert_eq!(c.value(), 0.05);
        assert_eq!(c.apply_dead_zone(0.1), 0.0);
        assert_eq!(c.apply_dead_zone(-0.2), -0.2);
    }

    #[test]
    fn test_relative_accept_accumulates() {
        let mut c = Component::relative_axis("X", axis::X);
        assert_eq!(c.accept(1.0), Some(1.0));
        assert_eq!(c.accept(0.0), None);
        assert_eq!(c.accept(2.0), Some(3.0));
        assert_eq!(c.value(), 3.0);
    }

    #[test]
    fn test_absolute_accept_suppresses_duplicates() {
        let mut c = Component::absolute_axis("X", axis::X).with_initial_value(0.5);
        assert_eq!(c.accept(0.5), None);
        assert!(c.has_polled());
        assert_eq!(c.accept(0.7), Some(0.7));
        assert_eq!(c.value(), 0.7);
    }

    #[test]
    fn test_sample_does_not_suppress_next_event() {
        let mut c = Component::new("Trigger", button::TRIGGER);
        c.store_sample(1.0);
        assert_eq!(c.value(), 1.0);
        assert_eq!(c.accept(1.0), Some(1.0));
        assert_eq!(c.accept(1.0), None);
    }

    #[test]
    fn test_suppressed_event_still_refreshes_value() {
        let mut c = Component::new("Trigger", button::TRIGGER);
        c.store_sample(1.0);
        assert_eq!(c.accept(0.0), None);
        assert_eq!(c.value(), 0.0);
    }

    #[test]
    fn test_begin_cycle() {
        let mut rel = Component::relative_axis("X", axis::X).with_initial_value(4.0);
        rel.begin_cycle();
        assert_eq!(rel.value(), 0.0);

        let mut abs = Component::absolute_axis("Y", axis::Y);
        abs.store_sample(0.3);
        assert!(abs.has_polled());
        abs.begin_cycle();
        assert!(!abs.has_polled());
        assert_eq!(abs.value(), 0.3);
    }
}
