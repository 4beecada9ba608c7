#[path = "common/mod.rs"]
mod common;

use common::*;
use rsent::{read_enriched, write_records, Emotion, MoodPipeline, Sentiment, YearMonth};

fn pipeline(dir: &std::path::Path) -> MoodPipeline {
    MoodPipeline::new()
        .raw_path(dir.join("posts.csv"))
        .enriched_path(dir.join("enriched.csv"))
        .progress(false)
}

/// One row: text is lowercased, URL and punctuation stripped, "i" dropped;
/// calendar fields come from `created_utc`.
#[test]
fn enriches_single_row_end_to_end() {
    let dir = scratch_dir();
    let p = pipeline(&dir);
    write_records(&dir.join("posts.csv"), &[post("p1", "mentalhealth", "", "I feel GREAT today! http://x.co", "2021-05-01 00:00:00")]).unwrap();

    let classifier = p.classifier(FakeBackend::new());
    let summary = p.enrich_with(&classifier).unwrap();
    assert_eq!(summary.rows_in, 1);
    assert_eq!(summary.rows_out, 1);

    let rows = read_enriched(&dir.join("enriched.csv")).unwrap();
    assert_eq!(rows.len(), 1);
    let r = &rows[0];
    assert_eq!(r.id, "p1");
    assert_eq!(r.clean_text, "feel great today");
    assert_eq!(r.full_text, " feel great today");
    assert_eq!(r.year, 2021);
    assert_eq!(r.month, 5);
    assert_eq!(r.day, "2021-05-01");
    assert_eq!(r.year_month, YearMonth::new(2021, 5));
    assert_eq!(r.sentiment, Sentiment::Positive);
    assert_eq!(r.emotion, Emotion::Joy);
}

/// A row whose timestamp does not parse is absent from the output entirely,
/// and the classifiers never see it.
#[test]
fn unparseable_timestamp_row_is_dropped() {
    let dir = scratch_dir();
    let p = pipeline(&dir);
    write_records(&dir.join("posts.csv"), &[
        post("good", "anxiety", "ok", "fine", "2020-12-31 23:59:59"),
        post("bad", "anxiety", "great", "great", "not-a-date"),
        post("blank", "anxiety", "great", "great", ""),
    ])
    .unwrap();

    let classifier = p.classifier(FakeBackend::new());
    let summary = p.enrich_with(&classifier).unwrap();
    assert_eq!(summary.rows_dropped, 2);

    let rows = read_enriched(&dir.join("enriched.csv")).unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["good"]);
    // one sentiment + one emotion call for the surviving row
    assert_eq!(classifier.backend().call_count(), 2);
}

/// Classification failures still yield both labels, as neutral.
#[test]
fn failed_classification_exports_neutral() {
    let dir = scratch_dir();
    let p = pipeline(&dir);
    write_records(&dir.join("posts.csv"), &[
        post("x", "bipolar", "boom", "everything exploded", "2019-07-07 07:07:07"),
        post("y", "bipolar", "", "", "2019-07-08 00:00:00"),
        post("z", "bipolar", "so sad", "alone again", "2019-07-09 00:00:00"),
    ])
    .unwrap();

    let classifier = p.classifier(FakeBackend::new());
    let summary = p.enrich_with(&classifier).unwrap();
    assert_eq!(summary.sentiment_fallbacks, 2);
    assert_eq!(summary.emotion_fallbacks, 2);

    let rows = read_enriched(&dir.join("enriched.csv")).unwrap();
    assert_eq!(rows[0].sentiment, Sentiment::Neutral);
    assert_eq!(rows[0].emotion, Emotion::Neutral);
    assert_eq!(rows[1].sentiment, Sentiment::Neutral);
    assert_eq!(rows[2].sentiment, Sentiment::Negative);
    assert_eq!(rows[2].emotion, Emotion::Sadness);
}

/// A missing input table fails loudly and leaves no output behind.
#[test]
fn missing_input_is_an_error() {
    let dir = scratch_dir();
    let p = pipeline(&dir);
    let classifier = p.classifier(FakeBackend::new());
    let err = p.enrich_with(&classifier).unwrap_err();
    assert!(err.to_string().contains("does not exist"));
    assert!(!dir.join("enriched.csv").exists());
}

/// Re-running recomputes everything and overwrites the previous export.
#[test]
fn rerun_overwrites_previous_export() {
    let dir = scratch_dir();
    let p = pipeline(&dir);
    let classifier = p.classifier(FakeBackend::new());

    write_records(&dir.join("posts.csv"), &[
        post("a", "s", "", "one", "2021-01-01 00:00:00"),
        post("b", "s", "", "two", "2021-01-02 00:00:00"),
    ])
    .unwrap();
    p.enrich_with(&classifier).unwrap();
    assert_eq!(read_enriched(&dir.join("enriched.csv")).unwrap().len(), 2);

    write_records(&dir.join("posts.csv"), &[post("c", "s", "", "three", "2021-01-03 00:00:00")]).unwrap();
    p.enrich_with(&classifier).unwrap();
    let rows = read_enriched(&dir.join("enriched.csv")).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "c");
}

/// Exported header is the raw columns followed by the derived ones.
#[test]
fn export_header_order() {
    let dir = scratch_dir();
    let p = pipeline(&dir);
    write_records(&dir.join("posts.csv"), &[post("a", "s", "", "x", "2021-01-01 00:00:00")]).unwrap();
    p.enrich_with(&p.classifier(FakeBackend::new())).unwrap();

    let text = std::fs::read_to_string(dir.join("enriched.csv")).unwrap();
    let header = text.lines().next().unwrap();
    assert_eq!(header, rsent::ENRICHED_COLUMNS.join(","));
}

/// A live enrichment run without an inference token stops before reading or
/// writing anything, rather than exporting a table of fallback labels.
#[test]
fn live_enrich_without_token_fails_up_front() {
    std::env::remove_var("HF_API_TOKEN");
    let dir = scratch_dir();
    let p = pipeline(&dir);
    write_records(&dir.join("posts.csv"), &[post("a", "s", "", "great", "2021-01-01 00:00:00")]).unwrap();

    let err = p.enrich().unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("inference credentials"), "{msg}");
    assert!(msg.contains("HF_API_TOKEN"), "{msg}");
    assert!(!dir.join("enriched.csv").exists());
}
