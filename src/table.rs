//! CSV tables with full-file read and temp-then-replace rewrite.

use crate::record::{EnrichedRecord, Record, ENRICHED_COLUMNS, RECORD_COLUMNS};
use crate::util::{create_with_backoff, inprogress_path, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Buffered CSV writer on a temp path. Rows are only visible at the final
/// location after `finish_atomic`.
pub struct TableWriter {
    path: PathBuf,
    w: Option<csv::Writer<BufWriter<File>>>,
}

impl TableWriter {
    pub fn create(path: &Path, header: &[&str]) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
        }
        let f = create_with_backoff(path, 16, 50).with_context(|| format!("create {}", path.display()))?;
        let mut w = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::with_capacity(256 * 1024, f));
        w.write_record(header)?;
        Ok(Self { path: path.to_path_buf(), w: Some(w) })
    }

    pub fn write_row<T: Serialize>(&mut self, row: &T) -> Result<()> {
        if let Some(w) = &mut self.w {
            w.serialize(row).with_context(|| format!("write row to {}", self.path.display()))?;
        }
        Ok(())
    }

    /// Write an already-formatted row as is.
    pub fn write_raw(&mut self, row: &csv::StringRecord) -> Result<()> {
        if let Some(w) = &mut self.w {
            w.write_record(row).with_context(|| format!("write row to {}", self.path.display()))?;
        }
        Ok(())
    }

    /// Flushes and promotes the temp file to `final_path`.
    pub fn finish_atomic(mut self, final_path: &Path) -> Result<()> {
        if let Some(mut w) = self.w.take() {
            w.flush().with_context(|| format!("flush {}", self.path.display()))?;
        }
        replace_file_atomic_backoff(&self.path, final_path)
    }
}

/// Read every row of `path`. Rows that fail to decode are skipped with a warning;
/// failing to open or read the file at all is an error.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(f);
    let mut rows = Vec::new();
    let mut bad = 0u64;
    for (i, row) in rdr.deserialize::<T>().enumerate() {
        match row {
            Ok(r) => rows.push(r),
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                return Err(e).with_context(|| format!("read {}", path.display()));
            }
            Err(e) => {
                bad += 1;
                tracing::debug!("{}: skipping row {}: {}", path.display(), i + 1, e);
            }
        }
    }
    if bad > 0 {
        tracing::warn!("{}: skipped {} malformed rows", path.display(), bad);
    }
    Ok(rows)
}

/// Every row of `path` as raw text, projected onto `columns` by header name
/// (absent columns come back empty). Cells are not decoded, so values a typed
/// read would reject survive a rewrite verbatim. Any read error fails the call.
pub fn read_raw_rows(path: &Path, columns: &[&str]) -> Result<Vec<csv::StringRecord>> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(f);
    let headers = rdr.headers().with_context(|| format!("read header of {}", path.display()))?.clone();
    let index: Vec<Option<usize>> =
        columns.iter().map(|c| headers.iter().position(|h| h.trim() == *c)).collect();

    let mut rows = Vec::new();
    for row in rdr.records() {
        let row = row.with_context(|| format!("read {}", path.display()))?;
        rows.push(index.iter().map(|&i| i.and_then(|i| row.get(i)).unwrap_or("")).collect());
    }
    Ok(rows)
}

/// Replace `dest` with exactly `rows` (header always written).
pub fn write_rows<T: Serialize>(dest: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    let mut w = TableWriter::create(&inprogress_path(dest), header)?;
    for r in rows {
        w.write_row(r)?;
    }
    w.finish_atomic(dest)
}

pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    read_rows(path)
}

pub fn write_records(dest: &Path, rows: &[Record]) -> Result<()> {
    write_rows(dest, &RECORD_COLUMNS, rows)
}

pub fn read_enriched(path: &Path) -> Result<Vec<EnrichedRecord>> {
    read_rows(path)
}

/// Overwrites `destination` with the full enriched table. No append mode.
pub fn export_enriched(rows: &[EnrichedRecord], destination: &Path) -> Result<()> {
    write_rows(destination, &ENRICHED_COLUMNS, rows)?;
    tracing::info!("Exported {} enriched rows to {}", rows.len(), destination.display());
    Ok(())
}
