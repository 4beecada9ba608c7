#[path = "common/mod.rs"]
mod common;

use common::*;
use rsent::{merge_by_id, read_records, replace_file_atomic_backoff, unseen_by_id, write_records, PostStore};
use std::collections::HashSet;

fn ids(rows: &[rsent::Record]) -> Vec<String> {
    rows.iter().map(|r| r.id.clone()).collect()
}

/// `admit` is true for a new id and false for every repeat, within one run.
#[test]
fn admit_is_idempotent_per_id() {
    let dir = scratch_dir();
    let mut store = PostStore::open(dir.join("posts.csv"), 100);

    let p1 = post("p1", "anxiety", "t", "body", "2021-05-01 00:00:00");
    assert!(store.admit(p1.clone()).unwrap());
    assert!(!store.admit(p1.clone()).unwrap());
    assert!(!store.admit(p1).unwrap());
    assert_eq!(store.pending_len(), 1);
    assert_eq!(store.seen_len(), 1);
}

/// Merging keeps existing rows first, adds only unseen pending ids, and keeps
/// the first copy of an id that appears twice in pending.
#[test]
fn merge_by_id_is_union_without_duplicates() {
    let existing = vec![
        post("a", "s", "old a", "", "2020-01-01 00:00:00"),
        post("b", "s", "old b", "", "2020-01-01 00:00:00"),
    ];
    let pending = vec![
        post("b", "s", "new b", "", "2021-01-01 00:00:00"),
        post("c", "s", "first c", "", "2021-01-01 00:00:00"),
        post("c", "s", "second c", "", "2021-01-01 00:00:00"),
    ];
    let merged = merge_by_id(existing, &pending);
    assert_eq!(ids(&merged), vec!["a", "b", "c"]);
    assert_eq!(merged[1].title, "old b");
    assert_eq!(merged[2].title, "first c");
}

/// Flushing against a file written by someone else re-reads it first, so no
/// prior row is lost and pending rows are all added.
#[test]
fn flush_merges_with_current_file_content() {
    let dir = scratch_dir();
    let path = dir.join("posts.csv");
    let mut store = PostStore::open(&path, 100);

    store.admit(post("n1", "ptsd", "new one", "", "2022-02-02 10:00:00")).unwrap();
    store.admit(post("n2", "ptsd", "new two", "", "2022-02-02 11:00:00")).unwrap();

    // File appears after open (independent writer between runs).
    write_records(&path, &[post("r1", "ocd", "prior", "", "2019-01-01 00:00:00")]).unwrap();

    let total = store.flush().unwrap();
    assert_eq!(total, 3);
    let rows = read_records(&path).unwrap();
    assert_eq!(ids(&rows), vec!["r1", "n1", "n2"]);
    assert_eq!(store.pending_len(), 0);
}

/// Every `save_every` admissions trigger a flush; `finish` flushes the tail.
#[test]
fn periodic_and_final_flush() {
    let dir = scratch_dir();
    let path = dir.join("posts.csv");
    let mut store = PostStore::open(&path, 2);

    store.admit(post("a", "s", "", "", "2021-01-01 00:00:00")).unwrap();
    assert!(!path.exists());
    store.admit(post("b", "s", "", "", "2021-01-01 00:00:00")).unwrap();
    assert_eq!(read_records(&path).unwrap().len(), 2);
    store.admit(post("c", "s", "", "", "2021-01-01 00:00:00")).unwrap();
    assert_eq!(read_records(&path).unwrap().len(), 2);

    let summary = store.finish().unwrap();
    assert_eq!(summary.admitted, 3);
    assert_eq!(summary.persisted, 3);
    assert_eq!(summary.flushes, 2);
    assert_eq!(read_records(&path).unwrap().len(), 3);
}

/// Reopening seeds the seen set from the file: ids from earlier runs are rejected,
/// and repeated flushes never introduce a duplicate.
#[test]
fn reopen_remembers_prior_ids() {
    let dir = scratch_dir();
    let path = dir.join("posts.csv");

    let mut first = PostStore::open(&path, 1);
    first.admit(post("p1", "s", "", "", "2021-01-01 00:00:00")).unwrap();
    first.admit(post("p2", "s", "", "", "2021-01-01 00:00:00")).unwrap();
    first.finish().unwrap();

    let mut second = PostStore::open(&path, 1);
    assert!(second.is_seen("p1"));
    assert!(!second.admit(post("p1", "s", "changed", "", "2021-01-01 00:00:00")).unwrap());
    assert!(second.admit(post("p3", "s", "", "", "2021-01-01 00:00:00")).unwrap());
    let summary = second.finish().unwrap();
    assert_eq!(summary.preexisting, 2);

    let rows = read_records(&path).unwrap();
    let unique: HashSet<_> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(unique.len(), 3);
    assert_eq!(rows[0].title, "");
}

/// A missing store file is "no prior data", not an error; finishing without any
/// admissions writes nothing.
#[test]
fn missing_store_is_empty() {
    let dir = scratch_dir();
    let path = dir.join("nested").join("posts.csv");
    let store = PostStore::open(&path, 10);
    assert_eq!(store.seen_len(), 0);
    let summary = store.finish().unwrap();
    assert_eq!(summary.flushes, 0);
    assert!(!path.exists());
}

/// Rows round-trip through the table with multi-line bodies, commas and quotes intact.
#[test]
fn store_preserves_awkward_text() {
    let dir = scratch_dir();
    let path = dir.join("posts.csv");
    let mut store = PostStore::open(&path, 10);
    let mut p = post("q1", "therapy", "Title, with \"quotes\"", "line one\nline two, still", "2021-03-04 05:06:07");
    p.score = -3;
    store.admit(p.clone()).unwrap();
    store.finish().unwrap();

    let rows = read_records(&path).unwrap();
    assert_eq!(rows, vec![p]);
}

/// `mark_seen` answers "was this new?" and remembers the id either way.
#[test]
fn mark_seen_reports_first_sighting_only() {
    let dir = scratch_dir();
    let mut store = PostStore::open(dir.join("posts.csv"), 10);
    assert!(!store.is_seen("x"));
    assert!(store.mark_seen("x"));
    assert!(store.is_seen("x"));
    assert!(!store.mark_seen("x"));
    assert_eq!(store.seen_len(), 1);
    assert_eq!(store.pending_len(), 0);
}

/// Only pending rows with ids unknown to the file and not repeated earlier in
/// pending are appended.
#[test]
fn unseen_by_id_filters_known_and_repeated_ids() {
    let pending = vec![
        post("a", "s", "", "", "2021-01-01 00:00:00"),
        post("c", "s", "first", "", "2021-01-01 00:00:00"),
        post("c", "s", "second", "", "2021-01-01 00:00:00"),
        post("d", "s", "", "", "2021-01-01 00:00:00"),
    ];
    let fresh = unseen_by_id(["a", "b"], &pending);
    let ids: Vec<&str> = fresh.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "d"]);
    assert_eq!(fresh[0].title, "first");
}

/// A row someone edited by hand so it no longer decodes (`1.2k`, `N/A`) is
/// still a known id after reopening, and flushing keeps it byte for byte.
#[test]
fn hand_edited_rows_survive_flush() {
    let dir = scratch_dir();
    let path = dir.join("posts.csv");
    let old1 = "old1,anxiety,fine,,12,2021-01-01 00:00:00,3,";
    let old2 = "old2,anxiety,edited,,1.2k,2021-01-02 00:00:00,N/A,";
    std::fs::write(&path, format!("{}\n{old1}\n{old2}\n", rsent::RECORD_COLUMNS.join(","))).unwrap();

    let mut store = PostStore::open(&path, 10);
    assert_eq!(store.seen_len(), 2);
    assert!(store.is_seen("old2"));
    assert!(!store.admit(post("old2", "anxiety", "refetched", "", "2021-01-02 00:00:00")).unwrap());
    assert!(store.admit(post("new1", "anxiety", "new", "", "2021-02-01 00:00:00")).unwrap());
    let summary = store.finish().unwrap();
    assert_eq!(summary.preexisting, 2);
    assert_eq!(summary.persisted, 3);

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], rsent::RECORD_COLUMNS.join(","));
    assert_eq!(lines[1], old1);
    assert_eq!(lines[2], old2);
    assert!(lines[3].starts_with("new1,anxiety,new,"));
}

/// Columns are matched by header name, so a file with reordered or missing
/// columns still seeds ids and is rewritten in the canonical order.
#[test]
fn store_reads_columns_by_name() {
    let dir = scratch_dir();
    let path = dir.join("posts.csv");
    std::fs::write(&path, "title,id,score\nhello,r1,5\n").unwrap();

    let mut store = PostStore::open(&path, 10);
    assert!(store.is_seen("r1"));
    store.admit(post("n1", "s", "", "", "2021-01-01 00:00:00")).unwrap();
    store.finish().unwrap();

    let rows = read_records(&path).unwrap();
    assert_eq!(ids(&rows), vec!["r1", "n1"]);
    assert_eq!(rows[0].title, "hello");
    assert_eq!(rows[0].score, 5);
}

/// Replacing a file overwrites it in place; when the replacement does not
/// exist the call fails and the old file is left as it was.
#[test]
fn replace_never_removes_destination_first() {
    let dir = scratch_dir();
    let dest = dir.join("posts.csv");
    let tmp = dir.join("posts.csv.inprogress");
    std::fs::write(&dest, "old").unwrap();

    std::fs::write(&tmp, "new").unwrap();
    replace_file_atomic_backoff(&tmp, &dest).unwrap();
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "new");
    assert!(!tmp.exists());

    assert!(replace_file_atomic_backoff(&tmp, &dest).is_err());
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "new");
}
