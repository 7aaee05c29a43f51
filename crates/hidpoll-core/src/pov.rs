// Hidpoll POV Synthesis
// Directional pad state composed from two orthogonal hat axes

use std::fmt;

use strum_macros::{EnumIter, IntoStaticStr};

/// One of the nine discrete states of a hat switch.
///
/// The component value carried for each direction goes clockwise from
/// up-left in eighths, with `Center` at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
pub enum PovDirection {
    Center,
    UpLeft,
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
}

impl PovDirection {
    /// Component value published for this direction
    pub const fn value(self) -> f32 {
        match self {
            PovDirection::Center => 0.0,
            PovDirection::UpLeft => 0.125,
            PovDirection::Up => 0.25,
            PovDirection::UpRight => 0.375,
            PovDirection::Right => 0.5,
            PovDirection::DownRight => 0.625,
            PovDirection::Down => 0.75,
            PovDirection::DownLeft => 0.875,
            PovDirection::Left => 1.0,
        }
    }

    /// Map a published component value back to its direction
    pub fn from_value(value: f32) -> Option<Self> {
        use strum::IntoEnumIterator;
        PovDirection::iter().find(|d| d.value() == value)
    }

    /// Resolve a raw `(x, y)` hat pair.
    ///
    /// Each axis reports -1, 0 or +1 with negative y meaning up. Matching is
    /// exact; any other pair yields `None`.
    pub fn from_axes(x: f32, y: f32) -> Option<Self> {
        let direction = match (sign(x)?, sign(y)?) {
            (-1, -1) => PovDirection::UpLeft,
            (-1, 0) => PovDirection::Left,
            (-1, 1) => PovDirection::DownLeft,
            (0, -1) => PovDirection::Up,
            (0, 0) => PovDirection::Center,
            (0, 1) => PovDirection::Down,
            (1, -1) => PovDirection::UpRight,
            (1, 0) => PovDirection::Right,
            (1, 1) => PovDirection::DownRight,
            _ => return None,
        };
        Some(direction)
    }
}

impl fmt::Display for PovDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &'static str = self.into();
        write!(f, "{}", name)
    }
}

fn sign(value: f32) -> Option<i8> {
    if value == -1.0 {
        Some(-1)
    } else if value == 0.0 {
        Some(0)
    } else if value == 1.0 {
        Some(1)
    } else {
        None
    }
}

/// Which raw axis of a hat an update targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HatAxis {
    X,
    Y,
}

/// Internal state of a synthesized hat switch.
///
/// The two raw axes are never exposed as components; only the composite
/// direction is, through the component at `component` in the owning
/// controller.
#[derive(Debug, Clone)]
pub struct PovHat {
    component: usize,
    x: f32,
    y: f32,
    anomalies: u64,
}

impl PovHat {
    pub(crate) fn new(component: usize) -> Self {
        Self {
            component,
            x: 0.0,
            y: 0.0,
            anomalies: 0,
        }
    }

    /// Index of the synthesized component in the owning controller
    pub fn component_index(&self) -> usize {
        self.component
    }

    /// Last raw `(x, y)` pair
    pub fn axes(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Number of raw pairs that matched no direction
    pub fn anomaly_count(&self) -> u64 {
        self.anomalies
    }

    /// Store one raw axis and recompute the composite direction.
    ///
    /// An unrecognised pair resolves to `Center` and is logged; it never
    /// fails the poll cycle.
    pub fn update(&mut self, axis: HatAxis, value: f32) -> PovDirection {
        match axis {
            HatAxis::X => self.x = value,
            HatAxis::Y => self.y = value,
        }
        self.direction()
    }

    fn direction(&mut self) -> PovDirection {
        match PovDirection::from_axes(self.x, self.y) {
            Some(direction) => direction,
            None => {
                self.anomalies += 1;
                log::warn!(
                    "Unknown hat axis values x = {} | y = {}, reporting center",
                    self.x,
                    self.y
                );
                PovDirection::Center
            }
        }
    }
}
