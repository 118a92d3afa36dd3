use std::env;
use std::panic;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use niwa_core::command::CommandSurface;
use niwa_core::storage::log_cask::LogCask;
use niwa_core::store::Store;

use niwa::command::{self, Command};
use niwa::config::ConfigLoad;
use niwa::trace;

#[derive(Debug, Parser)]
#[command(version, author, about = "A multi-agent hierarchical document store")]
struct Args {
    #[clap(subcommand)]
    command: Command,

    /// Agent identifier. Falls back to `NIWA_AGENT`, then the configured
    /// default.
    #[clap(long, global = true)]
    agent: Option<String>,

    /// Directory the store lives under. Defaults to `.niwa`.
    #[clap(long, global = true)]
    store_dir: Option<String>,

    #[clap(short = 'l', long, global = true)]
    log_level: Option<String>,

    /// Colorize terminal and log output. Overrides the configured default.
    #[clap(long, global = true)]
    color: bool,

    /// Disable colorized output. Overrides `--color` and the configured
    /// default.
    #[clap(long, global = true)]
    no_color: bool,
}

fn main() -> Result<()> {
    setup_panic_hooks();

    let args = Args::parse();
    let cfg = ConfigLoad::load();

    let color = if args.no_color {
        false
    } else if args.color {
        true
    } else {
        cfg.color()
    };
    colored::control::set_override(color);

    let log_dir = format!("{}/.niwa", env::var("HOME").unwrap_or_else(|_| ".".to_string()));
    let log_level = args.log_level.clone().unwrap_or_else(|| cfg.log_level());
    let _guards = trace::init_logging(&log_dir, &log_level, color)?;
    info!("niwa start args: {:?}", &args);

    let base_dir = match &args.command {
        Command::Init { path: Some(path) } => path.clone(),
        _ => ".".to_string(),
    };
    let store_dir = args.store_dir.clone().unwrap_or_else(|| cfg.store_dir());
    let store_path = PathBuf::from(&base_dir).join(&store_dir).join("store.log");
    if let Some(parent) = store_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let default_agent = args.agent.clone().or_else(|| cfg.default_agent.clone());

    let engine = if is_read_only(&args.command) {
        LogCask::open_read_only(store_path)?
    } else {
        LogCask::open(store_path)?
    };

    let mut surface = CommandSurface::new(Store::new(engine)?)?;

    match command::run(&mut surface, args.command, &default_agent) {
        Ok(()) => Ok(()),
        Err(err) => {
            eprintln!("error: {}", err);
            let exit_code =
                err.downcast_ref::<niwa_core::Error>().map(|e| e.exit_code()).unwrap_or(4);
            std::process::exit(exit_code);
        }
    }
}

/// Commands that never write to the store, so they can run against a
/// read-only snapshot without taking the exclusive file lock (spec §5).
fn is_read_only(command: &Command) -> bool {
    matches!(
        command,
        Command::Peek { .. }
            | Command::Conflicts { .. }
            | Command::History { .. }
            | Command::Diff { .. }
            | Command::Tree
            | Command::Export
            | Command::Search { .. }
            | Command::Status
            | Command::Agents
            | Command::Whoami { .. }
            | Command::Check
    )
}

fn setup_panic_hooks() {
    let meta = human_panic::Metadata {
        version: env!("CARGO_PKG_VERSION").into(),
        name: env!("CARGO_PKG_NAME").into(),
        authors: env!("CARGO_PKG_AUTHORS").replace(':', ", ").into(),
        homepage: env!("CARGO_PKG_HOMEPAGE").into(),
    };

    let default_hook = panic::take_hook();

    if env::var("RUST_BACKTRACE").is_err() {
        panic::set_hook(Box::new(move |info: &panic::PanicInfo| {
            default_hook(info);

            let file_path = human_panic::handle_dump(&meta, info);
            human_panic::print_msg(file_path, &meta)
                .expect("human-panic: printing error message to console failed");
        }));
    }
}
