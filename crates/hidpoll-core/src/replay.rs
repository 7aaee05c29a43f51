// Hidpoll Replay Scripts
// TOML descriptions of controllers plus the raw events fed to them frame by frame

#![cfg(feature = "toml-config")]

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::backend::{BackendError, RawEvent, ScriptedFeed};
use crate::environment::{any_platform, Plugin, PluginContext};
use crate::identifier::IdentifierParseError;
use crate::pov::HatAxis;
use crate::rumbler::RecordingRumbler;
use crate::{Component, Controller, ControllerType, Identifier, PortType};

/// Name the replay plugin registers under
pub const REPLAY_PLUGIN: &str = "replay";

/// Nanoseconds between frames when an event carries no timestamp
pub const FRAME_NANOS: u64 = 1_000_000;

/// Errors that can occur when loading or building a replay script
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Frame {frame} targets unknown controller '{name}'")]
    UnknownController { frame: usize, name: String },

    #[error("Invalid identifier in {context}: {source}")]
    InvalidIdentifier {
        context: String,
        #[source]
        source: IdentifierParseError,
    },

    #[error("Invalid replay script: {0}")]
    Invalid(String),
}

/// A parsed replay script.
///
/// ```toml
/// [[controller]]
/// name = "Pad"
/// type = "gamepad"
/// component = [{ id = "axis:x" }, { id = "button:trigger", name = "Fire" }]
/// pov = [{ id = "axis:pov" }]
///
/// [[frame]]
/// events = [
///   { controller = "Pad", id = "axis:x", value = 0.5 },
///   { controller = "Pad", hat = "axis:pov", axis = "y", value = -1.0 },
/// ]
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ReplayScript {
    #[serde(default, rename = "controller")]
    controllers: Vec<ControllerSpec>,

    #[serde(default, rename = "frame")]
    frames: Vec<FrameSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ControllerSpec {
    name: String,

    #[serde(default, rename = "type")]
    kind: Option<String>,

    #[serde(default)]
    port: Option<String>,

    #[serde(default)]
    port_number: u32,

    #[serde(default)]
    queue_capacity: Option<usize>,

    #[serde(default, rename = "component")]
    components: Vec<ComponentSpec>,

    #[serde(default, rename = "pov")]
    hats: Vec<ComponentSpec>,

    #[serde(default, rename = "rumbler")]
    rumblers: Vec<RumblerSpec>,

    /// Values returned when an absolute component is sampled lazily
    #[serde(default)]
    samples: HashMap<String, f32>,

    #[serde(default, rename = "child")]
    children: Vec<ControllerSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ComponentSpec {
    id: String,

    #[serde(default)]
    name: Option<String>,

    /// Defaults to true for axes
    #[serde(default)]
    analog: Option<bool>,

    #[serde(default)]
    relative: bool,

    #[serde(default)]
    dead_zone: f32,

    #[serde(default)]
    initial: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RumblerSpec {
    name: String,

    #[serde(default)]
    axis: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FrameSpec {
    #[serde(default)]
    events: Vec<StepSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepSpec {
    controller: String,

    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    hat: Option<String>,

    #[serde(default)]
    axis: Option<HatAxis>,

    #[serde(default)]
    value: Option<f32>,

    #[serde(default)]
    nanos: Option<u64>,

    /// Simulate a device failure at this point of the drain
    #[serde(default)]
    fail: Option<String>,
}

#[derive(Debug, Clone)]
enum Step {
    Event(RawEvent),
    Fail(String),
}

/// Feeds a built script's frames to its controllers' backends
#[derive(Debug, Clone)]
pub struct ReplayFeeder {
    names: Vec<String>,
    feeds: Vec<ScriptedFeed>,
    frames: Vec<Vec<(usize, Step)>>,
}

impl ReplayFeeder {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Controller names in depth-first order
    pub fn controller_names(&self) -> &[String] {
        &self.names
    }

    /// Queue frame `frame` on the backends; returns how many steps were queued
    pub fn feed_frame(&self, frame: usize) -> usize {
        let Some(steps) = self.frames.get(frame) else {
            return 0;
        };
        for (target, step) in steps {
            let feed = &self.feeds[*target];
            match step {
                Step::Event(event) => feed.push(*event),
                Step::Fail(message) => feed.push_failure(message.clone()),
            }
        }
        log::trace!("Fed replay frame {} ({} steps)", frame, steps.len());
        steps.len()
    }

    /// Steps queued on backends but not yet drained by a poll
    pub fn pending(&self) -> usize {
        self.feeds.iter().map(ScriptedFeed::pending).sum()
    }
}

impl ReplayScript {
    /// Load a script from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ReplayError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load a script from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ReplayError> {
        toml::from_str(content).map_err(|e| ReplayError::TomlParse(e.to_string()))
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Build the controllers and the feeder driving them.
    ///
    /// Controllers without their own `queue_capacity` get `default_capacity`.
    pub fn build(
        &self,
        default_capacity: usize,
    ) -> Result<(Vec<Controller>, ReplayFeeder), ReplayError> {
        let feeder = self.feeder()?;
        let controllers = self.assemble(default_capacity, &feeder.feeds)?;
        Ok((controllers, feeder))
    }

    /// Turn the script into a plugin that constructs its controllers when
    /// an environment scans, plus the feeder for those controllers
    pub fn into_plugin(self) -> Result<(Plugin, ReplayFeeder), ReplayError> {
        let feeder = self.feeder()?;
        // Surface construction errors now rather than at scan time
        self.assemble(0, &feeder.feeds)?;
        let feeds = feeder.feeds.clone();
        let plugin = Plugin::new(REPLAY_PLUGIN, any_platform, move |ctx: &PluginContext| {
            self.assemble(ctx.queue_capacity, &feeds)
                .map_err(|e| BackendError::Unsupported(e.to_string()))
        });
        Ok((plugin, feeder))
    }

    fn feeder(&self) -> Result<ReplayFeeder, ReplayError> {
        let mut specs = Vec::new();
        for spec in &self.controllers {
            flatten(spec, &mut specs);
        }

        let mut names: Vec<String> = Vec::new();
        let mut feeds = Vec::new();
        for spec in specs {
            if names.contains(&spec.name) {
                return Err(ReplayError::Invalid(format!(
                    "controller name '{}' is used twice",
                    spec.name
                )));
            }
            let feed = ScriptedFeed::new();
            for (id, value) in &spec.samples {
                let context = format!("samples of {}", spec.name);
                feed.set_sample(parse_identifier(id, &context)?, *value);
            }
            names.push(spec.name.clone());
            feeds.push(feed);
        }

        let frames = self
            .frames
            .iter()
            .enumerate()
            .map(|(index, frame)| {
                frame
                    .events
                    .iter()
                    .map(|step| resolve_step(index, step, &names))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ReplayFeeder {
            names,
            feeds,
            frames,
        })
    }

    fn assemble(
        &self,
        default_capacity: usize,
        feeds: &[ScriptedFeed],
    ) -> Result<Vec<Controller>, ReplayError> {
        let mut next = 0;
        self.controllers
            .iter()
            .map(|spec| build_controller(spec, default_capacity, feeds, &mut next))
            .collect()
    }
}

fn flatten<'a>(spec: &'a ControllerSpec, out: &mut Vec<&'a ControllerSpec>) {
    out.push(spec);
    for child in &spec.children {
        flatten(child, out);
    }
}

fn parse_identifier(text: &str, context: &str) -> Result<Identifier, ReplayError> {
    text.parse()
        .map_err(|source| ReplayError::InvalidIdentifier {
            context: context.to_string(),
            source,
        })
}

fn resolve_step(frame: usize, step: &StepSpec, names: &[String]) -> Result<(usize, Step), ReplayError> {
    let target = names
        .iter()
        .position(|n| *n == step.controller)
        .ok_or_else(|| ReplayError::UnknownController {
            frame,
            name: step.controller.clone(),
        })?;
    let context = format!("frame {}", frame);
    let nanos = step.nanos.unwrap_or(frame as u64 * FRAME_NANOS);

    let resolved = match (&step.fail, &step.id, &step.hat) {
        (Some(message), None, None) => Step::Fail(message.clone()),
        (None, Some(id), None) => {
            let value = require_value(step, &context)?;
            Step::Event(RawEvent::component(parse_identifier(id, &context)?, value, nanos))
        }
        (None, None, Some(hat)) => {
            let value = require_value(step, &context)?;
            let axis = step.axis.ok_or_else(|| {
                ReplayError::Invalid(format!("{}: hat event without an axis", context))
            })?;
            Step::Event(RawEvent::hat(parse_identifier(hat, &context)?, axis, value, nanos))
        }
        _ => {
            return Err(ReplayError::Invalid(format!(
                "{}: an event needs exactly one of id, hat or fail",
                context
            )))
        }
    };
    Ok((target, resolved))
}

fn require_value(step: &StepSpec, context: &str) -> Result<f32, ReplayError> {
    step.value
        .ok_or_else(|| ReplayError::Invalid(format!("{}: event without a value", context)))
}

fn build_component(spec: &ComponentSpec, owner: &str) -> Result<Component, ReplayError> {
    let identifier = parse_identifier(&spec.id, &format!("controller {}", owner))?;
    let name = spec
        .name
        .clone()
        .unwrap_or_else(|| identifier.name().to_string());
    let mut component = Component::new(name, identifier)
        .with_analog(spec.analog.unwrap_or_else(|| identifier.is_axis()))
        .with_relative(spec.relative)
        .with_dead_zone(spec.dead_zone);
    if let Some(initial) = spec.initial {
        component = component.with_initial_value(initial);
    }
    Ok(component)
}

fn build_controller(
    spec: &ControllerSpec,
    default_capacity: usize,
    feeds: &[ScriptedFeed],
    next: &mut usize,
) -> Result<Controller, ReplayError> {
    let feed = feeds
        .get(*next)
        .ok_or_else(|| ReplayError::Invalid("controller tree changed after validation".into()))?;
    *next += 1;

    let kind = match &spec.kind {
        Some(text) => text.parse::<ControllerType>().map_err(|_| {
            ReplayError::Invalid(format!("controller {}: unknown type '{}'", spec.name, text))
        })?,
        None => ControllerType::Unknown,
    };
    let port_type = match &spec.port {
        Some(text) => text.parse::<PortType>().map_err(|_| {
            ReplayError::Invalid(format!("controller {}: unknown port '{}'", spec.name, text))
        })?,
        None => PortType::Unknown,
    };

    let mut builder = Controller::builder(spec.name.as_str())
        .kind(kind)
        .port(port_type, spec.port_number)
        .queue_capacity(spec.queue_capacity.unwrap_or(default_capacity))
        .backend(feed.backend());

    for component in &spec.components {
        builder = builder.component(build_component(component, &spec.name)?);
    }
    for hat in &spec.hats {
        builder = builder.pov_hat(build_component(hat, &spec.name)?);
    }
    for rumbler in &spec.rumblers {
        let axis = rumbler
            .axis
            .as_deref()
            .map(|text| parse_identifier(text, &format!("rumbler {}", rumbler.name)))
            .transpose()?;
        builder = builder.rumbler(Box::new(RecordingRumbler::new(rumbler.name.as_str(), axis)));
    }
    for child in &spec.children {
        builder = builder.child(build_controller(child, default_capacity, feeds, next)?);
    }
    Ok(builder.build())
}
