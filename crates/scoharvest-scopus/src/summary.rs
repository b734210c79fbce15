//! Run summary: comfy-table for the console, plain text for `final_summary.txt`

use std::path::{Path, PathBuf};
use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use scoharvest_core::{FailureClass, fmt_num};

use crate::kind::{DetailTable, RecordKind};

/// Counts for one sweep over an identifier list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassStats {
    pub ids: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub succeeded: usize,
    /// Explicit failures plus identifiers the service never returned
    pub failed: usize,
    pub rows_written: usize,
}

/// Pipeline execution summary
#[derive(Debug, Clone)]
pub struct Summary {
    pub kind: RecordKind,
    pub input_ids: usize,
    pub unique_ids: usize,
    pub pass1: PassStats,
    /// `None` when the second pass was disabled or not needed
    pub pass2: Option<PassStats>,
    /// Identifiers recovered by replaying failed second-pass batches
    pub replay_recovered: usize,
    pub unresolved: usize,
    pub rows_written: usize,
    pub detail_rows: Vec<(DetailTable, usize)>,
    pub requests: u64,
    /// Failed requests per failure class, classes without failures omitted
    pub fetch_failures: Vec<(FailureClass, usize)>,
    pub stopped_early: bool,
    pub output_csv: PathBuf,
    pub elapsed: Duration,
}

impl Summary {
    /// Identifiers harvested by the second pass and its replay
    pub fn recovered(&self) -> usize {
        self.pass2.as_ref().map_or(0, |p| p.succeeded)
    }

    /// Format summary table as a string.
    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new(format!("Harvest: {}", self.kind))
                    .fg(Color::Cyan)
                    .add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Value").fg(Color::Cyan),
                Cell::new("%").fg(Color::Cyan),
            ]);

        table.add_row(vec![
            Cell::new("Input identifiers"),
            Cell::new(format!(
                "{} ({} unique)",
                fmt_num(self.input_ids),
                fmt_num(self.unique_ids)
            )),
            Cell::new(""),
        ]);
        add_pass_rows(&mut table, "Pass 1", &self.pass1, self.unique_ids);
        if let Some(pass2) = &self.pass2 {
            add_pass_rows(&mut table, "Pass 2", pass2, pass2.ids);
            if self.replay_recovered > 0 {
                table.add_row(vec![
                    Cell::new("  recovered by replay"),
                    Cell::new(fmt_num(self.replay_recovered)),
                    Cell::new(""),
                ]);
            }
        }
        table.add_row(vec![
            Cell::new("Rows written").fg(Color::Green),
            Cell::new(fmt_num(self.rows_written)).fg(Color::Green),
            Cell::new(format!("{:.1}", pct(self.rows_written, self.unique_ids))).fg(Color::Green),
        ]);
        let unresolved_color = if self.unresolved > 0 {
            Color::Yellow
        } else {
            Color::Reset
        };
        table.add_row(vec![
            Cell::new("Unresolved").fg(unresolved_color),
            Cell::new(fmt_num(self.unresolved)).fg(unresolved_color),
            Cell::new(format!("{:.1}", pct(self.unresolved, self.unique_ids))),
        ]);
        for (detail, rows) in &self.detail_rows {
            table.add_row(vec![
                Cell::new(format!("Detail: {detail}")),
                Cell::new(fmt_num(*rows)),
                Cell::new(""),
            ]);
        }
        table.add_row(vec![
            Cell::new("API requests"),
            Cell::new(self.requests.to_string()),
            Cell::new(""),
        ]);
        for (class, n) in &self.fetch_failures {
            table.add_row(vec![
                Cell::new(format!("  failed: {class}")).fg(Color::Yellow),
                Cell::new(fmt_num(*n)).fg(Color::Yellow),
                Cell::new(""),
            ]);
        }
        table.add_row(vec![
            Cell::new("Time"),
            Cell::new(format!("{:.1}s", self.elapsed.as_secs_f64())),
            Cell::new(""),
        ]);

        let mut out = format!("\n{table}");
        if self.stopped_early {
            out.push_str("\n  Stopped early on signal: unprocessed identifiers are listed as unresolved");
        }
        out
    }

    /// Print summary table to stderr.
    pub fn print(&self) {
        eprintln!("{}", self.format_table());
    }

    /// Log minimal summary (non-TTY mode).
    pub fn log(&self) {
        log::info!(
            "{} harvest complete: {} rows, {} recovered in pass 2, {} unresolved, {} requests in {:.1}s",
            self.kind,
            fmt_num(self.rows_written),
            fmt_num(self.recovered()),
            fmt_num(self.unresolved),
            self.requests,
            self.elapsed.as_secs_f64()
        );
    }

    /// Plain-text report for `final_summary.txt`
    pub fn render_text(&self) -> String {
        let mut lines = vec![
            format!(
                "Final summary: {} harvest, {}",
                self.kind,
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            ),
            String::new(),
            format!("Identifiers in input: {}", self.input_ids),
            format!("Unique identifiers: {}", self.unique_ids),
            String::new(),
        ];
        push_pass_lines(&mut lines, "Pass 1", &self.pass1);
        match &self.pass2 {
            Some(pass2) => {
                push_pass_lines(&mut lines, "Pass 2", pass2);
                lines.push(format!("  recovered by replay: {}", self.replay_recovered));
            }
            None => lines.push("Pass 2: not run".to_string()),
        }
        lines.push(String::new());
        lines.push(format!("Rows written: {}", self.rows_written));
        for (detail, rows) in &self.detail_rows {
            lines.push(format!("Detail rows ({detail}): {rows}"));
        }
        lines.push(format!("Unresolved identifiers: {}", self.unresolved));
        lines.push(format!("API requests (key usage): {}", self.requests));
        for (class, n) in &self.fetch_failures {
            lines.push(format!("  failed requests ({class}): {n}"));
        }
        lines.push(format!("Elapsed: {:.1}s", self.elapsed.as_secs_f64()));
        if self.stopped_early {
            lines.push("Run stopped early on signal".to_string());
        }
        lines.push(format!("Records: {}", self.output_csv.display()));
        lines.push(String::new());
        lines.join("\n")
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.render_text())
    }
}

fn add_pass_rows(table: &mut Table, name: &str, pass: &PassStats, total: usize) {
    table.add_row(vec![
        Cell::new(name),
        Cell::new(format!(
            "{} batches ({} failed)",
            fmt_num(pass.batches),
            fmt_num(pass.failed_batches)
        )),
        Cell::new(""),
    ]);
    table.add_row(vec![
        Cell::new("  succeeded"),
        Cell::new(fmt_num(pass.succeeded)),
        Cell::new(format!("{:.1}", pct(pass.succeeded, total))),
    ]);
    table.add_row(vec![
        Cell::new("  failed"),
        Cell::new(fmt_num(pass.failed)),
        Cell::new(format!("{:.1}", pct(pass.failed, total))),
    ]);
}

fn push_pass_lines(lines: &mut Vec<String>, name: &str, pass: &PassStats) {
    lines.push(format!(
        "{name}: {} identifiers in {} batches ({} failed)",
        pass.ids, pass.batches, pass.failed_batches
    ));
    lines.push(format!("  succeeded: {}", pass.succeeded));
    lines.push(format!("  failed: {}", pass.failed));
    lines.push(format!("  rows written: {}", pass.rows_written));
}

/// Calculate percentage safely.
fn pct(part: usize, total: usize) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}
