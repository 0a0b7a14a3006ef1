//! adb-mirror - Find Android phones and mirror their screen
//!
//! This is the binary entry point. All logic lives in the library crates.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use adb_mirror::commands;
use adbm_app::{
    default_config_path, init_config, load_settings, Orchestrator, TokioProcessRunner,
    ToolAvailability,
};

/// adb-mirror - List Android phones on USB and Wi-Fi and mirror them with scrcpy
#[derive(Parser, Debug)]
#[command(name = "adbm")]
#[command(about = "List Android phones on USB and Wi-Fi and mirror them with scrcpy", long_about = None)]
struct Args {
    /// Settings file (default: <config dir>/adb-mirror/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List phones (the default command)
    List {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mirror a listed phone, connecting to it first if needed
    Activate { id: String },

    /// Connect to a phone at ip:port and mirror it once it is ready
    Connect { address: String },

    /// Mirror a phone right away
    Mirror { id: String },

    /// Settings file helpers
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the settings file location
    Path,

    /// Write a default settings file if none exists
    Init,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(default_config_path);
    let command = args.command.unwrap_or(Command::List { json: false });

    if let Command::Config(config_command) = command {
        match config_command {
            ConfigCommand::Path => println!("{}", config_path.display()),
            ConfigCommand::Init => {
                if init_config(&config_path)? {
                    println!("Created {}", config_path.display());
                } else {
                    println!("{} already exists", config_path.display());
                }
            }
        }
        return Ok(());
    }

    adbm_core::logging::init()?;

    let settings = load_settings(&config_path);
    let tools = ToolAvailability::check(&settings.tools);
    if let Some(message) = tools.discovery_unavailable_message() {
        info!("{}", message);
    }

    let runner = Arc::new(TokioProcessRunner::new(settings.process.timeout()));
    let orchestrator = Orchestrator::new(runner, tools, &settings);
    let mut out = std::io::stdout();

    let result = match command {
        Command::List { json } => commands::list(&orchestrator, json, &mut out).await,
        Command::Activate { id } => commands::activate(&orchestrator, &id, &mut out).await,
        Command::Connect { address } => commands::connect(&orchestrator, &address, &mut out).await,
        Command::Mirror { id } => commands::mirror(&orchestrator, &id, &mut out).await,
        Command::Config(_) => Ok(()),
    };

    match &result {
        Err(e) if e.is_fatal() => error!("Command failed: {}", e),
        Err(e) => warn!("Command failed: {}", e),
        Ok(()) => {}
    }
    info!("adb-mirror exiting");
    Ok(result?)
}
