// Hidpoll Controller
// A node in the device tree owning its components, children, rumblers and event queue

mod builder;
mod poll;
mod shared;

pub use builder::ControllerBuilder;
pub use poll::{CycleStats, PollError, PollResult};
pub use shared::SharedController;

use std::collections::HashMap;
use std::fmt;

use smallvec::SmallVec;
use strum_macros::{Display, EnumIter, EnumString};

use crate::backend::DeviceBackend;
use crate::event::EventQueue;
use crate::pov::PovHat;
use crate::{Component, Identifier, Rumbler};

/// Broad category of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ControllerType {
    #[default]
    Unknown,
    Mouse,
    Keyboard,
    Fingerstick,
    Gamepad,
    Headtracker,
    Rudder,
    Stick,
    Trackball,
    Trackpad,
    Wheel,
}

/// How a controller is attached to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PortType {
    #[default]
    Unknown,
    Usb,
    Game,
    Network,
    Serial,
    I8042,
    Parallel,
}

/// Rumblers are rare and few; most controllers carry none
pub(crate) type RumblerList = SmallVec<[Box<dyn Rumbler>; 2]>;

/// One input device, or a logical group of devices.
///
/// The shape (components, hats, children, rumblers) is fixed at
/// construction. Only cached component values and the event queue change
/// afterwards, and only through the polling engine or the drain side.
pub struct Controller {
    name: String,
    kind: ControllerType,
    port_type: PortType,
    port_number: u32,
    components: Vec<Component>,
    index: HashMap<Identifier, usize>,
    hats: Vec<PovHat>,
    children: Vec<Controller>,
    rumblers: RumblerList,
    queue: EventQueue,
    backend: Box<dyn DeviceBackend>,
    last_cycle: CycleStats,
}

impl Controller {
    /// Start building a controller
    pub fn builder(name: impl Into<String>) -> ControllerBuilder {
        ControllerBuilder::new(name)
    }

    /// Build the identifier index so that the earliest-listed component wins.
    ///
    /// Components are inserted last to first; an earlier duplicate is
    /// inserted after a later one and overwrites it.
    pub(crate) fn index_components(components: &[Component]) -> HashMap<Identifier, usize> {
        let mut index = HashMap::with_capacity(components.len());
        for (position, component) in components.iter().enumerate().rev() {
            index.insert(component.identifier(), position);
        }
        index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn controller_type(&self) -> ControllerType {
        self.kind
    }

    pub fn port_type(&self) -> PortType {
        self.port_type
    }

    /// Zero-based port number
    pub fn port_number(&self) -> u32 {
        self.port_number
    }

    /// Components in priority order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Component at `index` in priority order
    pub fn component(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    /// Highest-priority component carrying `identifier`
    pub fn find(&self, identifier: Identifier) -> Option<&Component> {
        self.component_index(identifier)
            .map(|index| &self.components[index])
    }

    /// Position of the highest-priority component carrying `identifier`
    pub fn component_index(&self, identifier: Identifier) -> Option<usize> {
        self.index.get(&identifier).copied()
    }

    /// Synthesized hat switches
    pub fn hats(&self) -> &[PovHat] {
        &self.hats
    }

    /// Hat whose synthesized component carries `pov`
    pub fn hat(&self, pov: Identifier) -> Option<&PovHat> {
        let index = self.component_index(pov)?;
        self.hats.iter().find(|hat| hat.component_index() == index)
    }

    /// Child controllers in priority order
    pub fn children(&self) -> &[Controller] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Controller] {
        &mut self.children
    }

    /// Depth-first list of controllers without children
    pub fn leaves(&self) -> Vec<&Controller> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Controller>) {
        if self.children.is_empty() {
            out.push(self);
        } else {
            for child in &self.children {
                child.collect_leaves(out);
            }
        }
    }

    pub fn rumblers(&self) -> &[Box<dyn Rumbler>] {
        &self.rumblers
    }

    pub fn rumblers_mut(&mut self) -> &mut [Box<dyn Rumbler>] {
        &mut self.rumblers
    }

    pub fn event_queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Statistics of the most recent poll cycle
    pub fn last_cycle(&self) -> &CycleStats {
        &self.last_cycle
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("port_type", &self.port_type)
            .field("port_number", &self.port_number)
            .field("components", &self.components)
            .field("hats", &self.hats)
            .field("children", &self.children)
            .field("rumblers", &self.rumblers.len())
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
