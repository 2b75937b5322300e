//! Park Node - CLI for the parking lifecycle engine
//!
//! Every invocation opens the lot from its data directory, runs one
//! command and exits. `shell` keeps the lot open and reads commands
//! from stdin until `quit` or Ctrl-C.
//!
//! # Usage
//!
//! ```bash
//! park-node init
//! park-node register --reg KA01AB1234 --owner Asha --phone 9800000000 \
//!     --category car --zone A --slot A1
//! park-node exit --reg KA01AB1234
//! park-node pay --reg KA01AB1234
//! park-node receipt --reg KA01AB1234 --print
//!
//! # In-memory session
//! park-node --data-dir "" shell
//! ```

mod commands;
mod receipt;
mod shell;

use std::path::PathBuf;

use clap::Parser;
use park_core::{ParkingConfig, ParkingLot};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use commands::Command;

/// Parking lot lifecycle and billing
#[derive(Parser, Debug)]
#[command(name = "park-node", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Journal and snapshot directory (empty for in-memory)
    #[arg(short, long, global = true, default_value = "./park-data")]
    data_dir: PathBuf,

    /// Skip fsync after each journal write
    #[arg(long, global = true)]
    no_fsync: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn config(&self) -> ParkingConfig {
        if self.data_dir.as_os_str().is_empty() {
            ParkingConfig::in_memory()
        } else {
            ParkingConfig::persistent(&self.data_dir).with_fsync(!self.no_fsync)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = cli.config();
    info!("Opening lot (persistent={})", config.is_persistent());
    let lot = ParkingLot::open(&config)?;

    if let Command::Shell = cli.command {
        return shell::run(&lot).await;
    }

    match commands::execute(&lot, &cli.command) {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            error!("{} failed: {}", cli.command.name(), e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
