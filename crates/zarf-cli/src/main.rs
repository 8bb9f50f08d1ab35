//! Zarf CLI - compose and lint air-gapped Kubernetes package definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod display;
mod error;
mod exit_codes;

use config::Config;

#[derive(Parser)]
#[command(name = "zarf")]
#[command(version)]
#[command(about = "Compose and lint air-gapped Kubernetes package definitions", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (default: ./zarf-config.yaml)
    #[arg(long, global = true, env = "ZARF_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint a package definition and its imports
    Lint {
        /// Directory containing zarf.yaml
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Package template values (KEY=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Flavor to lint for
        #[arg(short, long)]
        flavor: Option<String>,

        /// Architecture to lint for
        #[arg(short, long)]
        architecture: Option<String>,

        /// Only report errors
        #[arg(long)]
        errors_only: bool,

        /// Output findings as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve imports into a single package definition
    Compose {
        /// Directory containing zarf.yaml
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Package template values (KEY=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Flavor to compose for
        #[arg(short, long)]
        flavor: Option<String>,

        /// Architecture to compose for
        #[arg(short, long)]
        architecture: Option<String>,

        /// Output file (if not set, writes to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> error::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Lint {
            path,
            set,
            flavor,
            architecture,
            errors_only,
            json,
        } => commands::lint::run(
            commands::lint::LintArgs {
                path: &path,
                set: &set,
                flavor,
                architecture,
                errors_only,
                json,
            },
            &config,
        ),

        Commands::Compose {
            path,
            set,
            flavor,
            architecture,
            output,
        } => commands::compose::run(
            commands::compose::ComposeArgs {
                path: &path,
                set: &set,
                flavor,
                architecture,
                output: output.as_deref(),
            },
            &config,
        ),
    }
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
