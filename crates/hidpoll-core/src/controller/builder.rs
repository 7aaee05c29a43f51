// Hidpoll Controller Builder
// Assembles the fixed shape of a controller at enumeration time

use crate::backend::{DeviceBackend, NullBackend};
use crate::event::{queue_config, EventQueue};
use crate::pov::PovHat;
use crate::{Component, Rumbler};

use super::{Controller, ControllerType, CycleStats, PortType, RumblerList};

/// Builder for [`Controller`]
pub struct ControllerBuilder {
    name: String,
    kind: ControllerType,
    port_type: PortType,
    port_number: u32,
    components: Vec<Component>,
    hat_components: Vec<usize>,
    children: Vec<Controller>,
    rumblers: RumblerList,
    queue_capacity: usize,
    backend: Option<Box<dyn DeviceBackend>>,
}

impl ControllerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ControllerType::Unknown,
            port_type: PortType::Unknown,
            port_number: 0,
            components: Vec::new(),
            hat_components: Vec::new(),
            children: Vec::new(),
            rumblers: RumblerList::new(),
            queue_capacity: queue_config::DEFAULT_CAPACITY,
            backend: None,
        }
    }

    pub fn kind(mut self, kind: ControllerType) -> Self {
        self.kind = kind;
        self
    }

    pub fn port(mut self, port_type: PortType, port_number: u32) -> Self {
        self.port_type = port_type;
        self.port_number = port_number;
        self
    }

    /// Append a component; earlier components take priority
    pub fn component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn components(mut self, components: impl IntoIterator<Item = Component>) -> Self {
        self.components.extend(components);
        self
    }

    /// Append a hat switch synthesized from two raw axes.
    ///
    /// `component` is exposed as the composite; it is forced absolute and
    /// digital since it only ever holds one of nine discrete values.
    pub fn pov_hat(mut self, component: Component) -> Self {
        self.hat_components.push(self.components.len());
        self.components
            .push(component.with_relative(false).with_analog(false));
        self
    }

    pub fn child(mut self, child: Controller) -> Self {
        self.children.push(child);
        self
    }

    pub fn rumbler(mut self, rumbler: Box<dyn Rumbler>) -> Self {
        self.rumblers.push(rumbler);
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn backend(mut self, backend: impl DeviceBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    pub fn boxed_backend(mut self, backend: Box<dyn DeviceBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Finish the controller; without a backend it never produces events
    pub fn build(self) -> Controller {
        let index = Controller::index_components(&self.components);
        let hats = self.hat_components.into_iter().map(PovHat::new).collect();
        Controller {
            name: self.name,
            kind: self.kind,
            port_type: self.port_type,
            port_number: self.port_number,
            components: self.components,
            index,
            hats,
            children: self.children,
            rumblers: self.rumblers,
            queue: EventQueue::new(self.queue_capacity),
            backend: self.backend.unwrap_or_else(|| Box::new(NullBackend)),
            last_cycle: CycleStats::default(),
        }
    }
}
