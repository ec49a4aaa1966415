//! Provision command - fetch and verify the shared base files.

use std::path::PathBuf;

use clap::Args;

use wupforge::provision::Provisioner;
use wupforge::toolkit::ToolSet;
use wupforge::KeyConfig;

use crate::error::CliError;

use super::default_cache_dir;

/// Arguments for the provision command.
#[derive(Debug, Args)]
pub struct ProvisionArgs {
    /// Path to the key configuration file.
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Root directory of the external tools.
    #[arg(long, default_value = "tools")]
    pub tools: PathBuf,

    /// Shared base-file cache directory.
    #[arg(long)]
    pub cache: Option<PathBuf>,
}

/// Run the provision command.
pub fn run(args: ProvisionArgs) -> Result<(), CliError> {
    let keys = KeyConfig::load(&args.config)?;
    let tools = ToolSet::new(&args.tools);
    let cache_dir = args.cache.clone().unwrap_or_else(default_cache_dir);

    let provisioner = Provisioner::new(&tools, &keys, &cache_dir);
    provisioner.ensure_base_files()?;
    println!("base files ready in {}", cache_dir.display());
    Ok(())
}
