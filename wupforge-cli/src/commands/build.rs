//! Build command - convert disc images into installable bundles.

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use wupforge::artwork::ReqwestClient;
use wupforge::batch::{discover_inputs, run_batch};
use wupforge::pipeline::BuildRequest;
use wupforge::provision::Provisioner;
use wupforge::title::TitleOptions;
use wupforge::toolkit::ToolSet;
use wupforge::{KeyConfig, TitleBuilder};

use crate::error::CliError;

use super::default_cache_dir;

/// Arguments for the build command.
#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Disc images or directories to scan (non-recursive).
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory the output bundles are written to.
    #[arg(long, short = 'o')]
    pub out: PathBuf,

    /// Path to the key configuration file.
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Root directory of the external tools.
    #[arg(long, default_value = "tools")]
    pub tools: PathBuf,

    /// Shared base-file cache directory.
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Worker pool width. One is always correct; more trades disk churn
    /// for throughput.
    #[arg(long, short = 'j', default_value_t = 1)]
    pub jobs: usize,

    /// Directory for per-build scratch trees instead of the system default.
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Tag rebuilt Wii images for the alternate online-service endpoint.
    #[arg(long)]
    pub wiimmfi: bool,

    /// Force the aspect-ratio-locked autoboot stub (GameCube).
    #[arg(long = "force-43")]
    pub force_43: bool,

    /// Loader stub to use verbatim instead of the catalog (GameCube).
    #[arg(long)]
    pub custom_forwarder: Option<PathBuf>,

    /// Select the non-autobooting forwarder stub (GameCube).
    #[arg(long)]
    pub disable_autoboot: bool,

    /// Icon source image applied to every title in the batch.
    #[arg(long)]
    pub icon: Option<PathBuf>,

    /// TV banner source image applied to every title in the batch.
    #[arg(long)]
    pub banner: Option<PathBuf>,
}

/// Run the build command.
pub fn run(args: BuildArgs) -> Result<(), CliError> {
    let keys = KeyConfig::load(&args.config)?;
    let tools = ToolSet::new(&args.tools);
    let cache_dir = args.cache.clone().unwrap_or_else(default_cache_dir);
    let http = ReqwestClient::new().map_err(|e| CliError::Http(e.to_string()))?;

    // Provision once, before the pool starts. Workers re-check the guard but
    // never download.
    let provisioner = Provisioner::new(&tools, &keys, &cache_dir);
    provisioner.ensure_base_files()?;

    let images = discover_inputs(&args.inputs)?;
    info!(count = images.len(), "discovered buildable inputs");

    let title_options = TitleOptions {
        use_wiimmfi: args.wiimmfi,
        force_43: args.force_43,
        custom_forwarder: args.custom_forwarder.clone(),
        disable_autoboot: args.disable_autoboot,
        ..TitleOptions::default()
    };
    let request = BuildRequest {
        icon: args.icon.clone(),
        banner: args.banner.clone(),
    };

    let mut builder = TitleBuilder::new(&keys, &tools, &http, provisioner);
    if let Some(work_dir) = &args.work_dir {
        builder = builder.with_scratch_root(work_dir);
    }

    let report = run_batch(
        &builder,
        &images,
        &args.out,
        &title_options,
        &request,
        args.jobs,
    )?;

    for built in &report.succeeded {
        println!(
            "{} -> {}",
            built.source.display(),
            built.bundle.display()
        );
    }
    if !report.failed.is_empty() {
        eprintln!("failed titles:");
        for failed in &report.failed {
            eprintln!("  {}: {}", failed.source.display(), failed.error);
        }
        return Err(CliError::TitlesFailed(report.failed.len()));
    }
    Ok(())
}
