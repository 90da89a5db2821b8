//! doorlink - door strike and doorbell controller
//!
//! This is the binary entry point. All logic lives in the library crates.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use doorlink_app::{init_config_file, load_settings, DEFAULT_CONFIG_FILENAME};
use doorlink_core::logging;

/// doorlink - door strike and doorbell controller
#[derive(Parser, Debug)]
#[command(name = "doorlink")]
#[command(about = "Keeps a door actuator connected to its control server", long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(long, short, value_name = "PATH", default_value = DEFAULT_CONFIG_FILENAME)]
    config: PathBuf,

    /// Mirror log output to stderr
    #[arg(long)]
    stderr: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a commented default configuration file
    InitConfig {
        /// Where to write it (defaults to --config)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    if let Some(Command::InitConfig { path }) = args.command {
        let path = path.unwrap_or(args.config);
        init_config_file(&path)?;
        eprintln!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let settings = load_settings(&args.config)?;
    logging::init(settings.logging.directory.as_deref(), args.stderr)?;
    tracing::info!("Configuration: {}", args.config.display());

    doorlink_app::run(settings).await?;
    tracing::info!("doorlink stopped");
    Ok(())
}
