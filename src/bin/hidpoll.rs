// Hidpoll CLI
// Lists controllers and replays scripted input through the polling engine

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;

use hidpoll_core::replay::ReplayFeeder;
use hidpoll_core::{
    Controller, Environment, PluginRegistry, ReplayScript, Settings, SharedController,
};

/// Poll human input devices and print their events
#[derive(Parser, Debug)]
#[command(name = "hidpoll")]
#[command(author = "hidpoll contributors")]
#[command(version = "0.3.0")]
#[command(about = "Platform-independent HID polling engine", long_about = None)]
struct Args {
    /// Replay script describing controllers and the input they produce
    #[arg(short, long, value_name = "SCRIPT")]
    script: Option<PathBuf>,

    /// Print the controller tree and exit
    #[arg(short, long)]
    list: bool,

    /// Event queue capacity for every controller (overrides settings)
    #[arg(short, long, value_name = "N")]
    queue_capacity: Option<usize>,

    /// Loop over the script until interrupted
    #[arg(short, long)]
    repeat: bool,

    /// Settings file (default: ~/.config/hidpoll/settings.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Main application state
struct Application {
    args: Args,
    settings: Settings,
    /// Flag to signal the poll loop to stop
    running: Arc<AtomicBool>,
}

impl Application {
    fn new(args: Args) -> anyhow::Result<Self> {
        let mut settings = match &args.config {
            Some(path) => Settings::from_file(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => Settings::load_default().context("failed to load default settings")?,
        };
        settings.apply_env().context("invalid plugin override in environment")?;
        if let Some(capacity) = args.queue_capacity {
            settings.set_queue_capacity(capacity);
        }

        Ok(Self {
            args,
            settings,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Register the available plugins and build the environment
    fn environment(&self) -> anyhow::Result<(Environment, Option<ReplayFeeder>)> {
        let mut registry = PluginRegistry::new();
        let mut feeder = None;

        if let Some(path) = &self.args.script {
            let script = ReplayScript::from_file(path)
                .with_context(|| format!("failed to load script {}", path.display()))?;
            let (plugin, script_feeder) = script
                .into_plugin()
                .with_context(|| format!("invalid script {}", path.display()))?;
            registry.register(plugin.as_default());
            feeder = Some(script_feeder);
        }

        let environment = Environment::new(registry, self.settings.plugin_selection());
        log::debug!("Platform: {}", environment.platform());
        Ok((environment, feeder))
    }

    fn list(&self, environment: &mut Environment) {
        let controllers = environment.controllers();
        if controllers.is_empty() {
            println!("No controllers found");
        }
        for controller in controllers {
            print_tree(&controller.lock(), 0);
        }
    }

    fn run(&self, environment: &mut Environment, feeder: Option<ReplayFeeder>) -> anyhow::Result<()> {
        let controllers = environment.controllers().to_vec();
        if controllers.is_empty() {
            bail!("no controllers to poll (use --script to replay one)");
        }

        self.install_signal_handler();

        let frames = feeder.as_ref().map_or(0, ReplayFeeder::frame_count);
        let interval = Duration::from_millis(self.settings.poll_interval_ms());
        let mut cycle = 0usize;

        while self.running.load(Ordering::SeqCst) {
            if !self.args.repeat && cycle >= frames {
                break;
            }
            if let Some(feeder) = &feeder {
                if frames > 0 {
                    feeder.feed_frame(cycle % frames);
                }
            }

            for controller in &controllers {
                poll_and_print(controller);
            }

            cycle += 1;
            std::thread::sleep(interval);
        }

        log::info!("Stopped after {} poll cycle(s)", cycle);
        Ok(())
    }

    fn install_signal_handler(&self) {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let running = self.running.clone();
        match Signals::new([SIGINT, SIGTERM]) {
            Ok(mut signals) => {
                std::thread::spawn(move || {
                    if signals.forever().next().is_some() {
                        println!("\nReceived signal, shutting down gracefully...");
                        running.store(false, Ordering::SeqCst);
                    }
                });
            }
            Err(e) => log::warn!("Could not install signal handler: {}", e),
        }
    }
}

fn poll_and_print(controller: &SharedController) {
    let mut guard = controller.lock();
    if let Err(e) = guard.poll_tree() {
        log::warn!("Poll failed: {}", e);
    }
    print_events(&mut guard);
}

fn print_events(controller: &mut Controller) {
    while let Some(event) = controller.drain_event() {
        println!("{}: {}", controller.name(), event);
    }
    let dropped = controller.last_cycle().dropped;
    if dropped > 0 {
        log::debug!("{}: {} event(s) dropped this cycle", controller.name(), dropped);
    }
    for child in controller.children_mut() {
        print_events(child);
    }
}

fn print_tree(controller: &Controller, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{}{} ({}, {} port {}, queue {})",
        indent,
        controller.name(),
        controller.controller_type(),
        controller.port_type(),
        controller.port_number(),
        controller.event_queue().capacity()
    );
    for (index, component) in controller.components().iter().enumerate() {
        let is_hat = controller.hats().iter().any(|h| h.component_index() == index);
        println!(
            "{}  {} {} [{}]{}{}",
            indent,
            if is_hat { "hat" } else { "component" },
            component.name(),
            component.identifier(),
            if component.is_analog() { " analog" } else { "" },
            if component.is_relative() { " relative" } else { "" },
        );
    }
    for rumbler in controller.rumblers() {
        match rumbler.axis_identifier() {
            Some(axis) => println!("{}  rumbler {} [{}]", indent, rumbler.axis_name(), axis),
            None => println!("{}  rumbler {}", indent, rumbler.axis_name()),
        }
    }
    for child in controller.children() {
        print_tree(child, depth + 1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let app = Application::new(args)?;
    let (mut environment, feeder) = app.environment()?;

    if app.args.list {
        app.list(&mut environment);
        return Ok(());
    }

    app.run(&mut environment, feeder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["hidpoll", "--script", "/tmp/pad.toml"]);

        assert_eq!(args.script, Some(PathBuf::from("/tmp/pad.toml")));
        assert!(!args.list);
        assert!(!args.repeat);
        assert!(!args.verbose);
        assert_eq!(args.queue_capacity, None);
        assert_eq!(args.config, None);
    }

    #[test]
    fn test_args_with_options() {
        let args = Args::parse_from([
            "hidpoll",
            "--script",
            "/tmp/pad.toml",
            "--queue-capacity",
            "4",
            "--repeat",
            "--verbose",
            "--config",
            "/tmp/settings.toml",
        ]);

        assert_eq!(args.queue_capacity, Some(4));
        assert!(args.repeat);
        assert!(args.verbose);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/settings.toml")));
    }

    #[test]
    fn test_args_list() {
        let args = Args::parse_from(["hidpoll", "--list"]);
        assert!(args.list);
    }
}
