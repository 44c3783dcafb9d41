//! coastrefine command line
//!
//! Builds the nearshore refinement region of a storm-surge run from an ASCII
//! topography raster.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Flood-fill selection and ruled-rectangle covering of bathymetry
#[derive(Parser)]
#[command(name = "coastrefine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Derive refinement regions from bathymetry rasters", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select the nearshore region and write the refinement file
    Run(commands::run::RunArgs),
    /// Show raster geometry and elevation range
    Info(commands::info::InfoArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
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
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Info(args) => commands::info::execute(args),
    }
}
