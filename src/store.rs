//! Incremental, id-deduplicated post store backed by one CSV file.
//!
//! The seen-id set is seeded from whatever the file already holds, so rerunning
//! the collector only ever adds new ids. Every flush re-reads the file and merges
//! before rewriting it; the file is assumed to have a single writer.
//!
//! Rows already on disk are carried as raw text and never re-typed, so a cell
//! edited by hand (`1.2k`, `N/A`) survives every flush unchanged.

use crate::record::{Record, RECORD_COLUMNS};
use crate::table::{read_raw_rows, TableWriter};
use crate::util::inprogress_path;
use ahash::AHashSet;
use anyhow::{Context, Result};
use csv::StringRecord;
use std::path::{Path, PathBuf};

/// Rows of `pending` whose id is neither in `existing` nor earlier in `pending`,
/// in pending order.
pub fn unseen_by_id<'a>(existing: impl IntoIterator<Item = &'a str>, pending: &'a [Record]) -> Vec<&'a Record> {
    let mut ids: AHashSet<&str> = existing.into_iter().collect();
    pending.iter().filter(|r| ids.insert(r.id.as_str())).collect()
}

/// Concatenate `existing` then `pending`, keeping the first row per id.
pub fn merge_by_id(existing: Vec<Record>, pending: &[Record]) -> Vec<Record> {
    let mut ids: AHashSet<String> = AHashSet::with_capacity(existing.len() + pending.len());
    let mut out: Vec<Record> = existing.into_iter().filter(|r| ids.insert(r.id.clone())).collect();
    let fresh: Vec<Record> = unseen_by_id(ids.iter().map(String::as_str), pending).into_iter().cloned().collect();
    out.extend(fresh);
    out
}

/// The `id` cell of a row projected onto `RECORD_COLUMNS`.
fn raw_id(row: &StringRecord) -> Option<&str> {
    row.get(0).map(str::trim).filter(|id| !id.is_empty())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreSummary {
    /// Ids known at open time.
    pub preexisting: usize,
    /// Records admitted during this run.
    pub admitted: usize,
    /// Rows in the file after the last flush.
    pub persisted: usize,
    pub flushes: usize,
}

pub struct PostStore {
    path: PathBuf,
    save_every: usize,
    seen: AHashSet<String>,
    pending: Vec<Record>,
    summary: StoreSummary,
}

impl PostStore {
    /// A missing or unreadable file means "no prior data".
    pub fn open(path: impl AsRef<Path>, save_every: usize) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut seen = AHashSet::new();
        if path.exists() {
            match read_raw_rows(&path, &RECORD_COLUMNS) {
                Ok(rows) => {
                    seen.extend(rows.iter().filter_map(raw_id).map(str::to_string));
                    tracing::info!("Loaded {} existing post ids from {}", seen.len(), path.display());
                }
                Err(e) => tracing::warn!("Failed to load existing store {}: {:#}", path.display(), e),
            }
        }
        let summary = StoreSummary { preexisting: seen.len(), ..Default::default() };
        Self { path, save_every: save_every.max(1), seen, pending: Vec::new(), summary }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// True (and remembered) if `id` is new. Pure membership bookkeeping, no I/O.
    pub fn mark_seen(&mut self, id: &str) -> bool {
        self.seen.insert(id.to_string())
    }

    /// Queue `record` if its id is unseen. Every `save_every` admissions the
    /// pending rows are flushed.
    pub fn admit(&mut self, record: Record) -> Result<bool> {
        if !self.mark_seen(&record.id) {
            return Ok(false);
        }
        self.pending.push(record);
        self.summary.admitted += 1;
        if self.summary.admitted % self.save_every == 0 {
            self.flush()?;
        }
        Ok(true)
    }

    /// Merge pending rows into the file's current content and rewrite it.
    /// Returns the number of rows now persisted. A no-op without pending rows.
    pub fn flush(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(self.summary.persisted);
        }
        // An unreadable file is left untouched rather than overwritten.
        let existing = if self.path.exists() {
            read_raw_rows(&self.path, &RECORD_COLUMNS)
                .with_context(|| format!("re-read {} before flush", self.path.display()))?
        } else {
            Vec::new()
        };
        let mut ids: AHashSet<&str> = AHashSet::with_capacity(existing.len());
        let kept: Vec<&StringRecord> =
            existing.iter().filter(|&row| raw_id(row).map_or(true, |id| ids.insert(id))).collect();
        let fresh = unseen_by_id(ids, &self.pending);
        let total = kept.len() + fresh.len();

        let mut w = TableWriter::create(&inprogress_path(&self.path), &RECORD_COLUMNS)?;
        for row in kept {
            w.write_raw(row)?;
        }
        for r in fresh {
            w.write_row(r)?;
        }
        w.finish_atomic(&self.path)?;
        tracing::info!("Saved {} total posts to {}", total, self.path.display());

        self.pending.clear();
        self.summary.persisted = total;
        self.summary.flushes += 1;
        Ok(total)
    }

    /// Final flush.
    pub fn finish(mut self) -> Result<StoreSummary> {
        self.flush()?;
        Ok(self.summary)
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn admitted(&self) -> usize {
        self.summary.admitted
    }
}
