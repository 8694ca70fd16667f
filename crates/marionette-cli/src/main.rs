//! Marionette CLI
//!
//! Drives the object runtime from the command line: prints the reflection
//! data of the sample classes and runs TOML scenario files against a fresh
//! object database.

mod classes;
mod commands;
mod output;
mod scenario;

use clap::{ArgAction, Parser, Subcommand};
use marionette_core::RuntimeConfig;
use output::{resolve_color_choice, StyledOutput};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding every other log filter
const LOG_ENV: &str = "MARIONETTE_LOG";

#[derive(Parser)]
#[command(name = "marionette")]
#[command(about = "Reflective object runtime driver", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// When to use colors: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the registered class tree
    Classes,

    /// Show the properties, methods and signals of a class
    Inspect {
        /// Class name
        class: String,
        /// Only list members declared by the class itself
        #[arg(long)]
        own: bool,
    },

    /// Run a scenario file
    Run {
        /// Scenario file (TOML)
        scenario: PathBuf,
        /// Runtime configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8, config: &RuntimeConfig) {
    let directive = match verbose {
        0 => config.log.filter.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let mut out = StyledOutput::new(resolve_color_choice(cli.color.as_deref()));

    if let Err(err) = run(cli, &mut out) {
        out.stderr_error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

fn run(cli: Cli, out: &mut StyledOutput) -> anyhow::Result<()> {
    let config = match &cli.command {
        Commands::Run {
            config: Some(path), ..
        } => commands::run::load_config(path)?,
        _ => RuntimeConfig::default(),
    };
    init_logging(cli.verbose, &config);

    match cli.command {
        Commands::Classes => commands::classes::execute(out),
        Commands::Inspect { class, own } => commands::inspect::execute(out, &class, own),
        Commands::Run { scenario, .. } => commands::run::execute(out, &scenario, config),
    }
}
