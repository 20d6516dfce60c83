//! Desktop mascot population manager.
//!
//! Runs a console front-end over the mascot core: one mascot per active image
//! set at startup, then line commands on stdin between supervisor ticks.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;

use shimeji::app::{App, ExitReason, Flow};
use shimeji::behavior::TimedEngine;
use shimeji::command::{ConsoleLine, HELP, parse_line};
use shimeji::console::{ConsoleShell, Input};
use shimeji::core::types::ImageSetId;
use shimeji::exit_codes;
use shimeji::io::config::{RuntimeConfig, load_config};
use shimeji::io::paths::Layout;
use shimeji::io::settings::load_settings;
use shimeji::logging;
use shimeji::registry::load_image_set;

#[derive(Parser)]
#[command(name = "shimeji", version, about = "Desktop mascot population manager")]
struct Cli {
    /// Installation root holding `conf/` and `img/`.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Exit with status 1 on fatal startup or reconfiguration errors.
    #[arg(long)]
    strict_exit: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the console front-end (default).
    Run,
    /// Load and validate image sets, then print a summary per set.
    Check {
        /// Image sets to check; defaults to the saved selection.
        image_sets: Vec<String>,
    },
    /// Print the image sets available for selection.
    List,
}

fn main() {
    let code = match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::FATAL
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let layout = Layout::new(&cli.root);
    let runtime = load_config(&layout.runtime_config_path)?;
    logging::init(&runtime.log_filter);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => Ok(cmd_run(layout, runtime, cli.strict_exit)),
        Command::Check { image_sets } => cmd_check(&layout, image_sets),
        Command::List => cmd_list(&layout),
    }
}

fn cmd_run(layout: Layout, runtime: RuntimeConfig, strict_exit: bool) -> i32 {
    let shell = ConsoleShell::from_stdin();
    let mut app = App::new(layout, runtime, TimedEngine, shell, StdRng::from_entropy());

    if app.startup() == Flow::Continue {
        println!(
            "{} mascot(s) running; type 'help' for commands",
            app.supervisor().len()
        );
        drive(&mut app);
    }

    let reason = app.exit_reason().unwrap_or(ExitReason::Requested);
    if reason.is_fatal() && strict_exit {
        exit_codes::FATAL
    } else {
        exit_codes::OK
    }
}

/// Interleave stdin commands with ticks until the app asks to exit.
fn drive(app: &mut App<TimedEngine, ConsoleShell>) {
    let interval = Duration::from_millis(app.runtime().tick_interval_ms);
    let mut next_tick = Instant::now() + interval;

    loop {
        let wait = next_tick.saturating_duration_since(Instant::now());
        let flow = match app.shell().poll(wait) {
            Input::Idle => {
                next_tick += interval;
                app.tick()
            }
            Input::Closed => app.exit(ExitReason::Requested),
            Input::Line(line) => match parse_line(&line) {
                Ok(Some(ConsoleLine::Command(command))) => app.handle(command),
                Ok(Some(ConsoleLine::Status)) => {
                    print_status(app);
                    Flow::Continue
                }
                Ok(Some(ConsoleLine::Behaviors)) => {
                    println!("{}", app.behavior_names().join(" "));
                    Flow::Continue
                }
                Ok(Some(ConsoleLine::Help)) => {
                    println!("{HELP}");
                    Flow::Continue
                }
                Ok(None) => Flow::Continue,
                Err(err) => {
                    println!("{err:#}");
                    Flow::Continue
                }
            },
        };
        if flow == Flow::Exit {
            break;
        }
    }
}

fn print_status(app: &App<TimedEngine, ConsoleShell>) {
    let active: Vec<&str> = app.image_sets().iter().map(ImageSetId::as_str).collect();
    println!("platform: {:?}", app.platform());
    println!("active image sets: {}", active.join("/"));
    if app.supervisor().is_empty() {
        println!("no mascots");
        return;
    }
    for mascot in app.supervisor().mascots() {
        let anchor = mascot.anchor();
        println!(
            "{} {} {} at ({}, {}) facing {}",
            mascot.id(),
            mascot.image_set(),
            mascot.behavior_name(),
            anchor.x,
            anchor.y,
            if mascot.look_right() { "right" } else { "left" }
        );
    }
}

fn cmd_check(layout: &Layout, image_sets: Vec<String>) -> Result<i32> {
    let ids: Vec<ImageSetId> = if image_sets.is_empty() {
        load_settings(&layout.settings_path).active_image_sets()
    } else {
        image_sets.into_iter().map(ImageSetId::new).collect()
    };
    if ids.is_empty() {
        bail!(
            "no image sets given and none saved in {}",
            layout.settings_path.display()
        );
    }

    let mut failed = 0usize;
    for id in &ids {
        match load_image_set(layout, id) {
            Ok(configuration) => println!(
                "{id}: ok ({} actions, {} behaviors)",
                configuration.actions().count(),
                configuration.behaviors().count()
            ),
            Err(err) => {
                failed += 1;
                println!("{id}: {:#}", anyhow::Error::from(err));
            }
        }
    }

    Ok(if failed == 0 {
        exit_codes::OK
    } else {
        exit_codes::FATAL
    })
}

fn cmd_list(layout: &Layout) -> Result<i32> {
    let active = load_settings(&layout.settings_path).active_image_sets();
    let available = layout.available_image_sets()?;
    if available.is_empty() {
        println!("no image sets under {}", layout.img_dir.display());
    }
    for id in available {
        if active.contains(&id) {
            println!("{id} (active)");
        } else {
            println!("{id}");
        }
    }
    Ok(exit_codes::OK)
}
