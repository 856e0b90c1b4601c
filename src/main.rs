mod app;
mod clock;
mod config;
mod glyph;
mod input;
mod sink;
mod view;
mod weather;

use crate::{
    app::App,
    clock::LocalClock,
    config::Config,
    input::{Command, InputListener},
    sink::terminal::TerminalSink,
    view::ViewFormatter,
    weather::Weather,
};
use anyhow::Context;
use env_logger::Target;
use log::{error, info, LevelFilter};
use std::{fs::OpenOptions, sync::mpsc};

fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_logging(&config);
    info!("Loaded config: {config:?}");

    let result = run(&config);
    if let Err(err) = &result {
        error!("Fatal error: {err:?}");
    }
    result
}

fn run(config: &Config) -> anyhow::Result<()> {
    let (sender, receiver) = mpsc::channel();
    // Signals go through the same channel as key presses, so the loop has a
    // chance to shut down cleanly
    let signal_sender = sender.clone();
    ctrlc::set_handler(move || {
        let _ = signal_sender.send(Command::Quit);
    })
    .context("Error setting signal handler")?;

    let mirror = sink::open_mirror(&config.mirror);
    let hint = ViewFormatter::new(config.language).hint();
    let terminal = TerminalSink::new(hint)?;
    let _input = InputListener::spawn(sender);

    App::new(
        config,
        Box::new(LocalClock),
        Box::new(Weather::new(config)),
        Box::new(terminal),
        mirror,
        receiver,
    )
    .run()
}

/// Log to the configured file, since the terminal is taken up by the
/// display. Falls back to stderr if the file can't be opened.
fn init_logging(config: &Config) {
    let mut builder = env_logger::builder();
    builder
        .filter_module("weatherclock", LevelFilter::Info)
        .parse_default_env();

    if let Some(path) = &config.log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(err) => {
                eprintln!("Error opening log file {}: {err}", path.display())
            }
        }
    }
    builder.init();
}
