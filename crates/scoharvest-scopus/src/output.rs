//! CSV output: main record file and detail tables

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::kind::{DetailTable, RecordKind};

/// Main CSV path: `{Kind}Records_{YYYYmmdd-HHMM}.csv`
pub fn record_file_path(dir: &Path, kind: RecordKind, now: chrono::DateTime<chrono::Local>) -> PathBuf {
    dir.join(format!("{}_{}.csv", kind.file_stem(), now.format("%Y%m%d-%H%M")))
}

/// Write one identifier per line, replacing any previous list.
pub fn write_id_list(path: &Path, ids: &[String]) -> Result<()> {
    let mut content = String::with_capacity(ids.len() * 16);
    for id in ids {
        content.push_str(id);
        content.push('\n');
    }
    std::fs::write(path, content).with_context(|| format!("Cannot write {}", path.display()))
}

/// Main CSV writer, one row per identifier.
///
/// Rows are flushed after every batch so an interrupted run keeps what it
/// harvested.
pub struct RecordWriter {
    writer: csv::Writer<File>,
    path: PathBuf,
    written: FxHashSet<String>,
    header_len: usize,
}

impl RecordWriter {
    pub fn create(path: &Path, kind: RecordKind) -> Result<Self> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Cannot create {}", path.display()))?;
        let header = kind.header();
        writer.write_record(&header)?;
        writer.flush()?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            written: FxHashSet::default(),
            header_len: header.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written so far
    pub fn len(&self) -> usize {
        self.written.len()
    }

    /// Append rows whose identifier has not been written yet.
    ///
    /// Returns the number of rows actually written.
    pub fn write_rows(&mut self, rows: &[Vec<String>]) -> Result<usize> {
        let mut n = 0;
        for row in rows {
            let Some(id) = row.first() else { continue };
            if row.len() != self.header_len {
                anyhow::bail!(
                    "row for {id} has {} fields, header has {}",
                    row.len(),
                    self.header_len
                );
            }
            if !self.written.insert(id.clone()) {
                log::debug!("{id}: already written, skipping duplicate row");
                continue;
            }
            self.writer.write_record(row)?;
            n += 1;
        }
        self.writer.flush()?;
        Ok(n)
    }
}

/// Detail rows gathered over the run, written once at the end.
#[derive(Debug, Default)]
pub struct DetailTables {
    rows: FxHashMap<DetailTable, Vec<Vec<String>>>,
}

impl DetailTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = (DetailTable, Vec<String>)>) {
        for (table, row) in rows {
            self.rows.entry(table).or_default().push(row);
        }
    }

    /// Write every table of `kind` (header only when empty), de-duplicated
    /// and sorted. Returns `(table, rows written)` per table.
    pub fn write_all(&mut self, dir: &Path, kind: RecordKind) -> Result<Vec<(DetailTable, usize)>> {
        let mut written = Vec::new();
        for &table in kind.detail_tables() {
            let mut rows = self.rows.remove(&table).unwrap_or_default();
            rows.sort();
            rows.dedup();

            let path = dir.join(table.file_name());
            let mut writer = csv::Writer::from_path(&path)
                .with_context(|| format!("Cannot create {}", path.display()))?;
            writer.write_record(table.header())?;
            for row in &rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
            log::debug!("{}: {} {table} rows", path.display(), rows.len());
            written.push((table, rows.len()));
        }
        Ok(written)
    }
}
