use anyhow::{Context, Result};

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

/// Trim, strip an optional `r/` prefix. Case is preserved because the API
/// echoes the community name back as given (e.g. `OCD`, `SuicideWatch`).
#[inline]
pub fn normalize_source_name(s: &str) -> String {
    let s = s.trim();
    let s = s.strip_prefix("r/").or_else(|| s.strip_prefix("R/")).unwrap_or(s);
    s.to_string()
}

// -------- default communities + merging from env --------

/// The communities collected when no explicit list is configured.
pub fn default_subreddits() -> Vec<String> {
    let defaults = [
        "mentalhealth",
        "depression",
        "anxiety",
        "selfimprovement",
        "therapy",
        "socialanxiety",
        "bipolar",
        "OCD",
        "ptsd",
        "addiction",
        "SuicideWatch",
        "stress",
        "lonely",
        "panicattack",
        "psychotherapy",
        "mentalillness",
    ];
    defaults.iter().map(|s| normalize_source_name(s)).collect()
}

/// Append extra communities from `RSENT_EXTRA_SUBREDDITS` (comma/semicolon/space
/// separated). Order is preserved; later duplicates (case-insensitive) are dropped.
pub fn merge_extra_subreddits(target: &mut Vec<String>) {
    if let Ok(s) = std::env::var("RSENT_EXTRA_SUBREDDITS") {
        for raw in s.split(|c: char| c == ',' || c == ';' || c.is_whitespace()) {
            let n = normalize_source_name(raw);
            if !n.is_empty() {
                target.push(n);
            }
        }
    }
    dedup_case_insensitive(target);
}

/// Keep the first occurrence of each name, comparing case-insensitively.
pub fn dedup_case_insensitive(list: &mut Vec<String>) {
    let mut seen = ahash::AHashSet::with_capacity(list.len());
    list.retain(|s| !s.is_empty() && seen.insert(s.to_lowercase()));
}

/// Cut `s` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// -------- robust create/replace with backoff (Windows-friendly) --------

use std::fs;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

/// Return true for transient/retriable I/O errors often seen on Windows when
/// filter drivers (AV/backup), synced folders, or sharing violations occur.
/// Spreadsheet apps holding the table open are the usual culprit here.
fn is_retriable_io_error(e: &io::Error) -> bool {
    match e.raw_os_error() {
        //   5   = Access is denied (often AV/share)
        //   32  = Sharing violation
        //   33  = Lock violation
        //   1224= The requested operation cannot be performed on a file with a user-mapped section open
        Some(5) | Some(32) | Some(33) | Some(1224) => true,
        _ => false,
    }
}

/// Sibling temp path used while a table is being rewritten.
pub fn inprogress_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".inprogress");
    dest.with_file_name(name)
}

/// Create a file with retries/backoff for transient errors.
pub fn create_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    let mut last_err: Option<io::Error> = None;
    let tries = tries.max(1);
    for i in 0..tries {
        match File::create(path) {
            Ok(f) => return Ok(f),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
                continue;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "create failed")))
}

/// Remove a file with retries/backoff for transient errors.
/// Succeeds if the file doesn't exist.
pub fn remove_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> Result<()> {
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match fs::remove_file(path) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "remove failed")))
        .with_context(|| format!("remove (retries) {}", path.display()))
}

/// Rename a file with retries/backoff for transient errors.
fn rename_with_backoff(src: &Path, dest: &Path, tries: usize, delay_ms: u64) -> Result<()> {
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match fs::rename(src, dest) {
            Ok(_) => return Ok(()),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("rename {} -> {}", src.display(), dest.display())),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "rename failed")))
        .with_context(|| format!("rename (retries) {} -> {}", src.display(), dest.display()))
}

/// Copy a file with retries/backoff for transient errors.
fn copy_with_backoff(src: &Path, dest: &Path, tries: usize, delay_ms: u64) -> Result<()> {
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match fs::copy(src, dest) {
            Ok(_) => return Ok(()),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("copy {} -> {}", src.display(), dest.display())),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "copy failed")))
        .with_context(|| format!("copy (retries) {} -> {}", src.display(), dest.display()))
}

/// Replace `dest` with `tmp`. The rename overwrites `dest` in one step; if it
/// keeps failing (e.g., due to sharing), copy over `dest` and drop `tmp`.
/// `dest` is never removed before its replacement is in place.
pub fn replace_file_atomic_backoff(tmp: &Path, dest: &Path) -> Result<()> {
    let tries = 20usize;
    let delay_ms = 50u64;
    match rename_with_backoff(tmp, dest, tries, delay_ms) {
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::debug!("{:#}; falling back to copy", e);
            copy_with_backoff(tmp, dest, tries, delay_ms)?;
            remove_with_backoff(tmp, tries, delay_ms)?;
            Ok(())
        }
    }
}
