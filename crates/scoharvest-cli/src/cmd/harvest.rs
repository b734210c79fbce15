//! Harvest subcommand - batch-query Scopus for an identifier list

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use scoharvest_core::{HttpClient, SharedProgress};
use scoharvest_scopus::RecordKind;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct HarvestArgs {
    /// Record kind the identifiers refer to
    #[arg(value_enum)]
    pub kind: KindArg,

    /// Text file with one identifier (author ID or EID) per line
    pub input: PathBuf,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Identifiers per request (1-25)
    #[arg(short, long)]
    pub page_size: Option<usize>,

    /// Skip the second pass over failed identifiers
    #[arg(long)]
    pub single_pass: bool,

    /// Do not replay batches that fail in the second pass
    #[arg(long)]
    pub no_replay: bool,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum KindArg {
    Authors,
    Publications,
}

impl From<KindArg> for RecordKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Authors => RecordKind::Authors,
            KindArg::Publications => RecordKind::Publications,
        }
    }
}

pub fn run(
    args: HarvestArgs,
    config: &Config,
    api_key: Option<String>,
    progress: &SharedProgress,
) -> Result<()> {
    let kind = RecordKind::from(args.kind);
    let output_dir = args
        .output
        .unwrap_or_else(|| config.output.default_dir.join(kind.to_string()));
    let api_key = api_key
        .or_else(|| config.scopus.api_key.clone())
        .context("No API key: use --api-key, set SCOPUS_API_KEY, or scopus.api_key in the config file")?;

    let harvest_config = scoharvest_scopus::Config {
        kind,
        input: args.input,
        output_dir: output_dir.clone(),
        api_key,
        base_url: config.scopus.base_url.clone(),
        page_size: args.page_size.unwrap_or(config.scopus.page_size),
        extraction_attempts: config.http.extraction_attempts,
        backoff: config.backoff.backoff(),
        second_pass: !args.single_pass,
        replay: !args.no_replay,
    };

    log::info!("Harvesting Scopus {kind}");
    log::info!("  Input: {}", harvest_config.input.display());
    log::info!("  Output: {}", output_dir.display());

    let mut client = HttpClient::new(&config.http.settings()).context("Failed to build HTTP client")?;
    let summary = scoharvest_scopus::run(&harvest_config, &mut client, progress)?;

    if progress.is_tty() {
        summary.print();
    } else {
        summary.log();
    }

    if summary.stopped_early {
        anyhow::bail!("Harvest stopped before all batches were processed");
    }
    Ok(())
}
