//! Enrichment: timestamp filter → text cleanup → sentiment pass → emotion pass → export.
//!
//! Rows whose `created_utc` does not parse are dropped before anything else
//! runs; they never reach the output. Every surviving row gets both labels,
//! `neutral` when classification fails.

use crate::classify::{ClassifierBackend, ClassifierKind, ClassifierService, Emotion, Sentiment};
use crate::date::{parse_created_utc, CalendarFields};
use crate::normalize::TextNormalizer;
use crate::progress::ProgressScope;
use crate::record::{full_text, EnrichedRecord, Record};
use crate::table::{export_enriched, read_records};
use anyhow::{bail, Context, Result};
use std::path::Path;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    pub rows_in: usize,
    /// Unparseable `created_utc`.
    pub rows_dropped: usize,
    pub rows_out: usize,
    pub sentiment_fallbacks: usize,
    pub emotion_fallbacks: usize,
}

/// Keep rows with a usable timestamp, paired with their calendar fields.
pub fn with_calendar(records: Vec<Record>) -> (Vec<(Record, CalendarFields)>, usize) {
    let total = records.len();
    let kept: Vec<_> = records
        .into_iter()
        .filter_map(|r| {
            let cal = parse_created_utc(&r.created_utc).and_then(CalendarFields::from_datetime)?;
            Some((r, cal))
        })
        .collect();
    let dropped = total - kept.len();
    (kept, dropped)
}

/// Enrich in memory. Rows keep input order.
pub fn enrich_records<B: ClassifierBackend>(
    records: Vec<Record>,
    normalizer: &TextNormalizer,
    classifier: &ClassifierService<B>,
    progress: bool,
) -> (Vec<EnrichedRecord>, EnrichSummary) {
    let rows_in = records.len();
    let (rows, rows_dropped) = with_calendar(records);
    if rows_dropped > 0 {
        tracing::warn!("Dropped {} rows with unparseable created_utc", rows_dropped);
    }

    let cleaned: Vec<String> = rows.iter().map(|(r, _)| normalizer.normalize(Some(&r.text))).collect();
    let full: Vec<String> = rows.iter().zip(&cleaned).map(|((r, _), c)| full_text(&r.title, c)).collect();

    let mut summary = EnrichSummary { rows_in, rows_dropped, ..Default::default() };

    tracing::info!("Analyzing sentiment...");
    let pb = ProgressScope::count_if(progress, "Sentiment", full.len() as u64);
    let sentiments: Vec<Sentiment> = full
        .iter()
        .map(|t| {
            let res = classifier.label_or_neutral(t, ClassifierKind::Sentiment);
            pb.inc_items(1);
            if res.fallback {
                summary.sentiment_fallbacks += 1;
            }
            res.label.sentiment().unwrap_or(Sentiment::Neutral)
        })
        .collect();
    pb.finish("Sentiment done");

    tracing::info!("Detecting emotion...");
    let pb = ProgressScope::count_if(progress, "Emotion", full.len() as u64);
    let emotions: Vec<Emotion> = full
        .iter()
        .map(|t| {
            let res = classifier.label_or_neutral(t, ClassifierKind::Emotion);
            pb.inc_items(1);
            if res.fallback {
                summary.emotion_fallbacks += 1;
            }
            res.label.emotion().unwrap_or(Emotion::Neutral)
        })
        .collect();
    pb.finish("Emotion done");

    let out: Vec<EnrichedRecord> = rows
        .into_iter()
        .zip(cleaned)
        .zip(sentiments.into_iter().zip(emotions))
        .map(|(((rec, cal), clean), (s, e))| EnrichedRecord::new(rec, clean, s, e, cal))
        .collect();

    summary.rows_out = out.len();
    (out, summary)
}

/// Read `input`, enrich every row from scratch, overwrite `output`.
/// A missing input is an error; nothing is written in that case.
pub fn enrich_file<B: ClassifierBackend>(
    input: &Path,
    output: &Path,
    normalizer: &TextNormalizer,
    classifier: &ClassifierService<B>,
    progress: bool,
) -> Result<EnrichSummary> {
    if !input.is_file() {
        bail!("input table {} does not exist", input.display());
    }
    let records = read_records(input).with_context(|| format!("load {}", input.display()))?;
    tracing::info!("Loaded {} rows from {}", records.len(), input.display());

    let (rows, summary) = enrich_records(records, normalizer, classifier, progress);
    export_enriched(&rows, output).with_context(|| format!("export {}", output.display()))?;

    if summary.sentiment_fallbacks + summary.emotion_fallbacks > 0 {
        tracing::warn!(
            "Fell back to neutral for {} sentiment and {} emotion labels",
            summary.sentiment_fallbacks,
            summary.emotion_fallbacks
        );
    }
    Ok(summary)
}
