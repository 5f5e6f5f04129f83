//! olmpack CLI - Generate OLM bundles from Kubernetes manifests

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

use commands::generate::GenerateArgs;

#[derive(Parser)]
#[command(name = "olmpack")]
#[command(author = "olmpack Contributors")]
#[command(version)]
#[command(about = "Generate OLM operator bundles from Kubernetes manifests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a registry+v1 bundle from manifests on stdin and a Helm Chart.yaml
    Generate(GenerateArgs),
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_logging(cli.debug);

    let result = match cli.command {
        Commands::Generate(args) => commands::generate::run(&args),
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `--debug`
fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
