mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{catalog::CatalogSubcommand, config::ConfigSubcommand, simulate::SimulateArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tbm",
    about = "TBM safety engine: interlock catalog, threshold checks, simulation and control server",
    version,
    propagate_version = true
)]
struct Cli {
    /// Engine config file (default: nearest tbm.yaml walking up from cwd)
    #[arg(long, global = true, env = "TBM_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and validate the interlock catalog
    Catalog {
        #[command(subcommand)]
        subcommand: CatalogSubcommand,
    },

    /// Evaluate a single threshold comparison
    #[command(allow_negative_numbers = true)]
    Eval {
        /// One of >=, <=, >, <
        operator: String,
        /// Measured value
        value: f64,
        /// Threshold to compare against
        threshold: f64,
    },

    /// Run the engine against simulated or scripted telemetry
    Simulate {
        /// Number of ticks (default: scenario length, else 10)
        #[arg(long)]
        ticks: Option<u64>,

        /// YAML scenario of per-tick commands and measurement values
        #[arg(long)]
        scenario: Option<PathBuf>,

        /// Command the cutterhead on before the first tick
        #[arg(long)]
        cutter_on: bool,

        /// Probability in [0, 1] that a simulated sample is missing
        #[arg(long, default_value = "0")]
        dropout: f64,

        /// Seed for reproducible simulated telemetry
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run the control loop and HTTP API
    Serve {
        /// Port to listen on (0 = OS-assigned)
        #[arg(long, default_value = "3141")]
        port: u16,
    },

    /// Show, create or validate tbm.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Catalog { subcommand } => cmd::catalog::run(config, subcommand, cli.json),
        Commands::Eval {
            operator,
            value,
            threshold,
        } => cmd::eval::run(&operator, value, threshold, cli.json),
        Commands::Simulate {
            ticks,
            scenario,
            cutter_on,
            dropout,
            seed,
        } => cmd::simulate::run(
            config,
            SimulateArgs {
                ticks,
                scenario,
                cutter_on,
                dropout,
                seed,
            },
            cli.json,
        ),
        Commands::Serve { port } => cmd::serve::run(config, port),
        Commands::Config { subcommand } => cmd::config::run(config, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
