//! Wupforge CLI - command-line interface
//!
//! Thin argument-parsing layer over the wupforge library.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{build, provision};

#[derive(Parser)]
#[command(
    name = "wupforge",
    version,
    about = "Repackage GameCube and Wii disc images as installable Wii U packages"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert disc images into installable bundles.
    Build(build::BuildArgs),

    /// Fetch and verify the shared base files without building anything.
    Provision(provision::ProvisionArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Build(args) => build::run(args),
        Command::Provision(args) => provision::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
