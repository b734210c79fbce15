//! Main runner for the batch harvest
//!
//! Pass 1 sweeps every input identifier. Identifiers that failed or were
//! never returned go through pass 2, whose failed batches are replayed once.
//! Batches run one at a time; a stop request is honoured between batches.

use std::time::Instant;

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use scoharvest_core::{
    FailureClass, Fetch, LogCategory, ProgressContext, RunLog, is_shutdown_requested,
};

use crate::config::Config;
use crate::extract::KindScanners;
use crate::input::read_ids;
use crate::ledger::{PassLedger, unresolved};
use crate::output::{DetailTables, RecordWriter, record_file_path, write_id_list};
use crate::query::{build_query_url, redact_api_key};
use crate::record::RowAssembler;
use crate::summary::{PassStats, Summary};

/// A batch that failed, kept for replay
#[derive(Debug, Clone)]
pub struct FailedBatch {
    pub label: String,
    pub ids: Vec<String>,
    pub url: String,
}

struct PassOutcome {
    stats: PassStats,
    failed_batches: Vec<FailedBatch>,
    stopped: bool,
}

/// Shared state of the batch loop
struct BatchRunner<'a, F: Fetch> {
    config: &'a Config,
    fetcher: &'a mut F,
    log: &'a RunLog,
    assembler: &'a RowAssembler<'a>,
    writer: &'a mut RecordWriter,
    details: &'a mut DetailTables,
    progress: &'a ProgressContext,
    requests: u64,
    fetch_failures: FxHashMap<FailureClass, usize>,
}

impl<F: Fetch> BatchRunner<'_, F> {
    fn run_pass(&mut self, pass: u8, ids: &[String], ledger: &mut PassLedger) -> Result<PassOutcome> {
        let page_size = self.config.page_size;
        let batch_count = ids.len().div_ceil(page_size);
        log::info!(
            "Pass {pass}: {} identifiers in {batch_count} batches",
            ids.len()
        );

        let pb = self
            .progress
            .pass_bar(&format!("pass {pass}"), batch_count as u64);
        let mut stats = PassStats {
            ids: ids.len(),
            ..Default::default()
        };
        let mut failed_batches = Vec::new();
        let mut stopped = false;

        for (i, batch) in ids.chunks(page_size).enumerate() {
            if is_shutdown_requested() {
                log::warn!(
                    "Stop requested: skipping {} remaining batches of pass {pass}",
                    batch_count - i
                );
                stopped = true;
                break;
            }

            let first = i * page_size + 1;
            let label = format!("entries {first}-{}", first + batch.len() - 1);
            pb.set_message(label.clone());

            let url = build_query_url(
                &self.config.base_url,
                self.config.kind,
                batch,
                page_size,
                &self.config.api_key,
            )?;
            stats.batches += 1;
            match self.run_batch(pass, &label, batch, &url, ledger)? {
                Some(rows) => stats.rows_written += rows,
                None => {
                    stats.failed_batches += 1;
                    failed_batches.push(FailedBatch {
                        label,
                        ids: batch.to_vec(),
                        url,
                    });
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        stats.succeeded = ledger.successes_within(ids);
        stats.failed = ledger.failures_against(ids).len();
        log::info!(
            "Pass {pass}: {} succeeded, {} failed, {}/{} batches failed",
            stats.succeeded,
            stats.failed,
            stats.failed_batches,
            stats.batches
        );
        Ok(PassOutcome {
            stats,
            failed_batches,
            stopped,
        })
    }

    /// Re-issue failed batches once; returns identifiers recovered and rows
    /// written.
    fn replay(&mut self, batches: &[FailedBatch], ledger: &mut PassLedger) -> Result<(usize, usize)> {
        log::info!("Replaying {} failed batches", batches.len());
        let mut rows_written = 0;
        for batch in batches {
            if is_shutdown_requested() {
                log::warn!("Stop requested: replay interrupted");
                break;
            }
            let label = format!("replay {}", batch.label);
            if let Some(rows) = self.run_batch(2, &label, &batch.ids, &batch.url, ledger)? {
                rows_written += rows;
            }
        }
        // every replayed identifier had failed, so any success now is a recovery
        let recovered = batches
            .iter()
            .flat_map(|b| &b.ids)
            .filter(|id| ledger.is_success(id))
            .count();
        Ok((recovered, rows_written))
    }

    /// Fetch and assemble one batch.
    ///
    /// `Ok(Some(rows))` on success, `Ok(None)` when the batch failed and its
    /// identifiers were marked failed. `Err` only when output cannot be written.
    fn run_batch(
        &mut self,
        pass: u8,
        label: &str,
        ids: &[String],
        url: &str,
        ledger: &mut PassLedger,
    ) -> Result<Option<usize>> {
        self.requests += 1;
        let redacted = redact_api_key(url);

        let body = match self.fetcher.fetch(url) {
            Ok(body) => body,
            Err(e) => {
                let class = e.class();
                *self.fetch_failures.entry(class).or_default() += 1;
                log::warn!("{label}: {e} ({})", class.describe());
                self.log
                    .record(LogCategory::Fetch(class), format!("{e} - {redacted}"));
                self.fail_batch(pass, ids, &redacted, ledger);
                self.config.backoff.pause(class);
                return Ok(None);
            }
        };

        match self.assembler.assemble(&body, label) {
            Ok(batch) => {
                let rows = self
                    .writer
                    .write_rows(&batch.rows)
                    .with_context(|| format!("Cannot write rows to {}", self.writer.path().display()))?;
                batch.write_id_lists(self.log);
                ledger.record_success(batch.ids());
                let missed = ids.iter().filter(|id| !ledger.is_success(id)).count();
                if missed > 0 {
                    log::debug!("{label}: {missed} identifiers not returned");
                }
                self.details.extend(batch.details);
                log::debug!("{label}: {rows} rows");
                Ok(Some(rows))
            }
            Err(e) => {
                log::warn!("{label}: {e}");
                self.log
                    .record(e.category(), format!("{label}: {e} - {redacted}"));
                self.fail_batch(pass, ids, &redacted, ledger);
                Ok(None)
            }
        }
    }

    fn fail_batch(&self, pass: u8, ids: &[String], redacted: &str, ledger: &mut PassLedger) {
        ledger.record_failure(ids.iter().map(String::as_str));
        self.log.record(LogCategory::ProblemUrls { pass }, redacted);
    }
}

/// Run a harvest end to end and write every output file.
pub fn run<F: Fetch>(config: &Config, fetcher: &mut F, progress: &ProgressContext) -> Result<Summary> {
    let start = Instant::now();
    config.validate()?;

    std::fs::create_dir_all(&config.output_dir).context("Failed to create output directory")?;
    let log = RunLog::open(&config.log_dir()).context("Failed to create log directory")?;

    let input = read_ids(&config.input)?;
    log::info!(
        "{} harvest: {} identifiers ({} unique) from {}",
        config.kind,
        input.raw_count,
        input.ids.len(),
        config.input.display()
    );

    let scanners = KindScanners::new(config.kind).context("Invalid tag pattern")?;
    let assembler = RowAssembler::new(
        config.kind,
        &scanners,
        &log,
        config.page_size,
        config.extraction_attempts,
    );
    let csv_path = record_file_path(&config.output_dir, config.kind, chrono::Local::now());
    let mut writer = RecordWriter::create(&csv_path, config.kind)?;
    let mut details = DetailTables::new();

    let mut runner = BatchRunner {
        config,
        fetcher,
        log: &log,
        assembler: &assembler,
        writer: &mut writer,
        details: &mut details,
        progress,
        requests: 0,
        fetch_failures: FxHashMap::default(),
    };

    // Pass 1
    let mut first = PassLedger::new();
    let pass1 = runner.run_pass(1, &input.ids, &mut first)?;
    let retry_ids = first.failures_against(&input.ids);
    write_id_list(&config.output_dir.join("successful_ids_pass1.txt"), &first.successes())?;
    write_id_list(&config.output_dir.join("failed_ids_pass1.txt"), &retry_ids)?;
    let mut stopped = pass1.stopped;

    // Pass 2 over failures, then one replay of its failed batches
    let mut second = PassLedger::new();
    let mut pass2 = None;
    let mut replay_recovered = 0;
    if config.second_pass && !retry_ids.is_empty() && !stopped {
        let mut outcome = runner.run_pass(2, &retry_ids, &mut second)?;
        stopped = outcome.stopped;
        if config.replay && !outcome.failed_batches.is_empty() && !stopped {
            let (recovered, rows) = runner.replay(&outcome.failed_batches, &mut second)?;
            replay_recovered = recovered;
            outcome.stats.rows_written += rows;
            outcome.stats.succeeded = second.successes_within(&retry_ids);
            outcome.stats.failed = second.failures_against(&retry_ids).len();
            stopped = is_shutdown_requested();
        }
        write_id_list(&config.output_dir.join("successful_ids_pass2.txt"), &second.successes())?;
        pass2 = Some(outcome.stats);
    } else if retry_ids.is_empty() {
        log::info!("Pass 1 harvested every identifier, skipping pass 2");
    }

    let requests = runner.requests;
    let fetch_failures: Vec<(FailureClass, usize)> = FailureClass::ALL
        .into_iter()
        .filter_map(|class| runner.fetch_failures.get(&class).map(|&n| (class, n)))
        .collect();
    let left = unresolved(&input.ids, &[&first, &second]);
    write_id_list(&config.output_dir.join("unresolved_ids.txt"), &left)?;
    if !left.is_empty() {
        log::warn!(
            "{} identifiers unresolved, see {}",
            left.len(),
            config.output_dir.join("unresolved_ids.txt").display()
        );
    }

    let detail_rows = details.write_all(&config.output_dir, config.kind)?;

    let summary = Summary {
        kind: config.kind,
        input_ids: input.raw_count,
        unique_ids: input.ids.len(),
        pass1: pass1.stats,
        pass2,
        replay_recovered,
        unresolved: left.len(),
        rows_written: writer.len(),
        detail_rows,
        requests,
        fetch_failures,
        stopped_early: stopped,
        output_csv: csv_path,
        elapsed: start.elapsed(),
    };
    let summary_path = config.output_dir.join("final_summary.txt");
    summary
        .write_to(&summary_path)
        .with_context(|| format!("Cannot write {}", summary_path.display()))?;
    log::info!("Records written to {}", summary.output_csv.display());

    Ok(summary)
}
