//! scoharvest - batch harvester for Scopus author and publication records
//!
//! Queries the Scopus search API 25 identifiers at a time, writes one CSV
//! row per harvested identifier and retries failures in a second pass.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "scoharvest")]
#[command(about = "Batch harvester for Scopus author and publication records")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (default: $SCOHARVEST_CONFIG, ./scoharvest.toml, then the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Scopus API key (overrides config file and SCOPUS_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Harvest records for a list of identifiers
    Harvest(cmd::harvest::HarvestArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(scoharvest_core::ProgressContext::new());

    // TTY: log lines are printed above the batch bar
    let multi = if progress.is_tty() {
        Some(progress.multi())
    } else {
        None
    };
    scoharvest_core::init_logging(cli.debug, multi)?;

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Harvest(args) => {
            scoharvest_core::install_signal_handlers()?;
            cmd::harvest::run(args, &config, cli.api_key, &progress)
        }
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "Output directory",
                &config.output.default_dir.display().to_string(),
            ]);
            table.add_row(vec!["Scopus base URL", &config.scopus.base_url]);
            table.add_row(vec![
                "Scopus API key",
                if cli.api_key.is_some() || config.scopus.api_key.is_some() {
                    "configured"
                } else {
                    "not set"
                },
            ]);
            table.add_row(vec!["Page size", &config.scopus.page_size.to_string()]);
            table.add_row(vec![
                "Request timeout",
                &format!("{}s", config.http.request_timeout),
            ]);
            table.add_row(vec![
                "Connect timeout",
                &format!("{}s", config.http.connect_timeout),
            ]);
            table.add_row(vec![
                "Proxy",
                config.http.proxy.as_deref().unwrap_or("system"),
            ]);
            table.add_row(vec![
                "Extraction attempts",
                &config.http.extraction_attempts.to_string(),
            ]);
            let b = &config.backoff;
            table.add_row(vec![
                "Pauses (404/400/5xx/other/net)",
                &format!(
                    "{}s/{}s/{}s/{}s/{}s",
                    b.not_found, b.quota_exceeded, b.server_error, b.other_http, b.non_http
                ),
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
