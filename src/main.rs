mod config;
mod io;
mod kernel;

use std::path::PathBuf;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::{PolicyKind, SimulationConfig};
use kernel::Driver;

/// Uniprocessor scheduling simulator
#[derive(Parser)]
#[command(name = "scheduling-simulator")]
#[command(version)]
#[command(about = "Simulates process scheduling with blocking disk reads", long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, default_value = "data/simulation.toml")]
    config: PathBuf,

    /// Scheduling policy (fcfs, round-robin, priority)
    #[arg(short, long)]
    policy: Option<PolicyKind>,

    /// Quantum in ticks
    #[arg(short, long)]
    quantum: Option<u32>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    let mut config = SimulationConfig::load(&cli.config)?;
    if let Some(policy) = cli.policy {
        config.policy = policy;
    }
    if let Some(quantum) = cli.quantum {
        config.quantum = quantum;
    }
    config.validate()?;

    let mut driver = Driver::from_config(&config)?;
    if let Err(err) = driver.start() {
        error!(%err, "simulation aborted");
        return Err(err.into());
    }
    driver.print_stats();

    Ok(())
}
