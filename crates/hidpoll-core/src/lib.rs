// Hidpoll Core Library
// Platform-independent polling engine for human input devices

pub mod backend;
pub mod component;
pub mod controller;
pub mod environment;
pub mod event;
pub mod identifier;
pub mod pov;
pub mod rumbler;

#[cfg(feature = "toml-config")]
pub mod replay;
#[cfg(feature = "toml-config")]
pub mod settings;

pub use backend::{
    BackendError, BackendResult, DeviceBackend, NullBackend, RawEvent, RawTarget, ScriptedBackend,
    ScriptedFeed,
};
pub use component::Component;
pub use controller::{
    Controller, ControllerBuilder, ControllerType, CycleStats, PollError, PollResult, PortType,
    SharedController,
};
pub use environment::{
    Environment, OsFamily, Platform, Plugin, PluginContext, PluginRegistry, PluginSelection,
};
pub use event::{Event, EventQueue};
pub use identifier::{Identifier, IdentifierKind, IdentifierParseError};
pub use pov::{HatAxis, PovDirection, PovHat};
pub use rumbler::{RecordingRumbler, Rumbler};

#[cfg(feature = "toml-config")]
pub use replay::{ReplayError, ReplayFeeder, ReplayScript};
#[cfg(feature = "toml-config")]
pub use settings::{Settings, SettingsError};
