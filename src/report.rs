//! Summary tables over the enriched export: label trends per month, pre/post
//! cutoff distributions, sentiment × emotion cross-tab, engagement, per-community
//! distributions, per-label score/comment statistics and word frequencies.
//! Counting happens in `ReportAccumulator::ingest`; proportions are computed
//! once in `finish`.

use crate::classify::{Emotion, Sentiment};
use crate::date::YearMonth;
use crate::record::EnrichedRecord;
use crate::table::read_enriched;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub const DEFAULT_CUTOFF_YEAR: u16 = 2020;
pub const DEFAULT_TOP_WORDS: usize = 50;

/// Five-number summary plus mean (box-plot statistics).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Distribution {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
}

impl Distribution {
    /// Quartiles use linear interpolation between closest ranks.
    pub fn from_values(values: &mut [i64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        values.sort_unstable();
        let n = values.len();
        let q = |p: f64| -> f64 {
            let pos = p * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let (a, b) = (values[lo] as f64, values[hi] as f64);
            a + (b - a) * (pos - lo as f64)
        };
        let sum: f64 = values.iter().map(|&v| v as f64).sum();
        Self {
            count: n,
            min: values[0] as f64,
            q1: q(0.25),
            median: q(0.5),
            q3: q(0.75),
            max: values[n - 1] as f64,
            mean: sum / n as f64,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Engagement {
    pub mean_score: f64,
    pub mean_comments: f64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct Report {
    pub rows: usize,
    pub cutoff_year: u16,
    pub monthly_sentiment: BTreeMap<YearMonth, BTreeMap<Sentiment, f64>>,
    pub monthly_emotion: BTreeMap<YearMonth, BTreeMap<Emotion, f64>>,
    pub sentiment_before_cutoff: BTreeMap<Sentiment, f64>,
    pub sentiment_from_cutoff: BTreeMap<Sentiment, f64>,
    pub emotion_before_cutoff: BTreeMap<Emotion, f64>,
    pub emotion_from_cutoff: BTreeMap<Emotion, f64>,
    /// Row-normalized per sentiment.
    pub sentiment_emotion_crosstab: BTreeMap<Sentiment, BTreeMap<Emotion, f64>>,
    /// Share of all posts falling in each month.
    pub monthly_volume: BTreeMap<YearMonth, f64>,
    pub monthly_engagement: BTreeMap<YearMonth, Engagement>,
    pub subreddit_sentiment: BTreeMap<String, BTreeMap<Sentiment, f64>>,
    pub subreddit_emotion: BTreeMap<String, BTreeMap<Emotion, f64>>,
    pub score_by_sentiment: BTreeMap<Sentiment, Distribution>,
    pub comments_by_emotion: BTreeMap<Emotion, Distribution>,
    pub top_words_by_emotion: BTreeMap<Emotion, Vec<(String, u64)>>,
}

type Counts<K> = BTreeMap<K, u64>;

fn bump<K: Ord>(m: &mut Counts<K>, k: K) {
    *m.entry(k).or_insert(0) += 1;
}

fn proportions<K: Ord + Clone>(counts: &Counts<K>) -> BTreeMap<K, f64> {
    let total: u64 = counts.values().sum();
    if total == 0 {
        return BTreeMap::new();
    }
    counts.iter().map(|(k, &v)| (k.clone(), v as f64 / total as f64)).collect()
}

fn nested_proportions<O: Ord + Clone, K: Ord + Clone>(m: &BTreeMap<O, Counts<K>>) -> BTreeMap<O, BTreeMap<K, f64>> {
    m.iter().map(|(o, c)| (o.clone(), proportions(c))).collect()
}

fn merge_counts<K: Ord>(into: &mut Counts<K>, from: Counts<K>) {
    for (k, v) in from {
        *into.entry(k).or_insert(0) += v;
    }
}

fn merge_nested<O: Ord, K: Ord>(into: &mut BTreeMap<O, Counts<K>>, from: BTreeMap<O, Counts<K>>) {
    for (o, c) in from {
        merge_counts(into.entry(o).or_default(), c);
    }
}

/// Running counts for a `Report`.
#[derive(Clone, Debug)]
pub struct ReportAccumulator {
    cutoff_year: u16,
    top_words: usize,
    rows: usize,
    monthly_sentiment: BTreeMap<YearMonth, Counts<Sentiment>>,
    monthly_emotion: BTreeMap<YearMonth, Counts<Emotion>>,
    sentiment_before: Counts<Sentiment>,
    sentiment_from: Counts<Sentiment>,
    emotion_before: Counts<Emotion>,
    emotion_from: Counts<Emotion>,
    crosstab: BTreeMap<Sentiment, Counts<Emotion>>,
    monthly_posts: Counts<YearMonth>,
    /// Per-month (score, comments) totals; i128 holds any sum of i64 cells.
    monthly_score_sum: BTreeMap<YearMonth, (i128, i128)>,
    subreddit_sentiment: BTreeMap<String, Counts<Sentiment>>,
    subreddit_emotion: BTreeMap<String, Counts<Emotion>>,
    scores: BTreeMap<Sentiment, Vec<i64>>,
    comments: BTreeMap<Emotion, Vec<i64>>,
    words: BTreeMap<Emotion, ahash::AHashMap<String, u64>>,
}

impl Default for ReportAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOFF_YEAR, DEFAULT_TOP_WORDS)
    }
}

impl ReportAccumulator {
    pub fn new(cutoff_year: u16, top_words: usize) -> Self {
        Self {
            cutoff_year,
            top_words,
            rows: 0,
            monthly_sentiment: BTreeMap::new(),
            monthly_emotion: BTreeMap::new(),
            sentiment_before: Counts::new(),
            sentiment_from: Counts::new(),
            emotion_before: Counts::new(),
            emotion_from: Counts::new(),
            crosstab: BTreeMap::new(),
            monthly_posts: Counts::new(),
            monthly_score_sum: BTreeMap::new(),
            subreddit_sentiment: BTreeMap::new(),
            subreddit_emotion: BTreeMap::new(),
            scores: BTreeMap::new(),
            comments: BTreeMap::new(),
            words: BTreeMap::new(),
        }
    }

    pub fn ingest(&mut self, r: &EnrichedRecord) {
        self.rows += 1;
        let ym = r.year_month;

        bump(self.monthly_sentiment.entry(ym).or_default(), r.sentiment);
        bump(self.monthly_emotion.entry(ym).or_default(), r.emotion);

        if r.year < self.cutoff_year {
            bump(&mut self.sentiment_before, r.sentiment);
            bump(&mut self.emotion_before, r.emotion);
        } else {
            bump(&mut self.sentiment_from, r.sentiment);
            bump(&mut self.emotion_from, r.emotion);
        }

        bump(self.crosstab.entry(r.sentiment).or_default(), r.emotion);

        bump(&mut self.monthly_posts, ym);
        let sums = self.monthly_score_sum.entry(ym).or_insert((0, 0));
        sums.0 += i128::from(r.score);
        sums.1 += i128::from(r.num_comments);

        bump(self.subreddit_sentiment.entry(r.subreddit.clone()).or_default(), r.sentiment);
        bump(self.subreddit_emotion.entry(r.subreddit.clone()).or_default(), r.emotion);

        self.scores.entry(r.sentiment).or_default().push(r.score);
        self.comments.entry(r.emotion).or_default().push(r.num_comments);

        let words = self.words.entry(r.emotion).or_default();
        for w in r.clean_text.split_whitespace() {
            *words.entry(w.to_string()).or_insert(0) += 1;
        }
    }

    pub fn merge(&mut self, other: Self) {
        self.rows += other.rows;
        merge_nested(&mut self.monthly_sentiment, other.monthly_sentiment);
        merge_nested(&mut self.monthly_emotion, other.monthly_emotion);
        merge_counts(&mut self.sentiment_before, other.sentiment_before);
        merge_counts(&mut self.sentiment_from, other.sentiment_from);
        merge_counts(&mut self.emotion_before, other.emotion_before);
        merge_counts(&mut self.emotion_from, other.emotion_from);
        merge_nested(&mut self.crosstab, other.crosstab);
        merge_counts(&mut self.monthly_posts, other.monthly_posts);
        for (ym, (s, c)) in other.monthly_score_sum {
            let e = self.monthly_score_sum.entry(ym).or_insert((0, 0));
            e.0 += s;
            e.1 += c;
        }
        merge_nested(&mut self.subreddit_sentiment, other.subreddit_sentiment);
        merge_nested(&mut self.subreddit_emotion, other.subreddit_emotion);
        for (k, v) in other.scores {
            self.scores.entry(k).or_default().extend(v);
        }
        for (k, v) in other.comments {
            self.comments.entry(k).or_default().extend(v);
        }
        for (k, m) in other.words {
            let into = self.words.entry(k).or_default();
            for (w, n) in m {
                *into.entry(w).or_insert(0) += n;
            }
        }
    }

    pub fn finish(self) -> Report {
        let monthly_engagement = self
            .monthly_score_sum
            .iter()
            .filter_map(|(ym, &(s, c))| {
                let n = *self.monthly_posts.get(ym)? as f64;
                Some((*ym, Engagement { mean_score: s as f64 / n, mean_comments: c as f64 / n }))
            })
            .collect();

        let top_n = self.top_words;
        let top_words_by_emotion = self
            .words
            .into_iter()
            .map(|(emo, counts)| {
                let mut v: Vec<(String, u64)> = counts.into_iter().collect();
                v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                v.truncate(top_n);
                (emo, v)
            })
            .collect();

        Report {
            rows: self.rows,
            cutoff_year: self.cutoff_year,
            monthly_sentiment: nested_proportions(&self.monthly_sentiment),
            monthly_emotion: nested_proportions(&self.monthly_emotion),
            sentiment_before_cutoff: proportions(&self.sentiment_before),
            sentiment_from_cutoff: proportions(&self.sentiment_from),
            emotion_before_cutoff: proportions(&self.emotion_before),
            emotion_from_cutoff: proportions(&self.emotion_from),
            sentiment_emotion_crosstab: nested_proportions(&self.crosstab),
            monthly_volume: proportions(&self.monthly_posts),
            monthly_engagement,
            subreddit_sentiment: nested_proportions(&self.subreddit_sentiment),
            subreddit_emotion: nested_proportions(&self.subreddit_emotion),
            score_by_sentiment: self.scores.into_iter().map(|(k, mut v)| (k, Distribution::from_values(&mut v))).collect(),
            comments_by_emotion: self.comments.into_iter().map(|(k, mut v)| (k, Distribution::from_values(&mut v))).collect(),
            top_words_by_emotion,
        }
    }
}

pub fn build_report(rows: &[EnrichedRecord], cutoff_year: u16, top_words: usize) -> Report {
    let mut acc = ReportAccumulator::new(cutoff_year, top_words);
    for r in rows {
        acc.ingest(r);
    }
    acc.finish()
}

pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let out = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(out);
    serde_json::to_writer_pretty(&mut w, report)?;
    w.flush()?;
    Ok(())
}

/// Load the enriched table, summarize, write JSON.
pub fn report_file(input: &Path, output: &Path, cutoff_year: u16, top_words: usize) -> Result<Report> {
    if !input.is_file() {
        bail!("enriched table {} does not exist", input.display());
    }
    let rows = read_enriched(input).with_context(|| format!("load {}", input.display()))?;
    let report = build_report(&rows, cutoff_year, top_words);
    write_report(&report, output)?;
    tracing::info!("Wrote report over {} rows to {}", report.rows, output.display());
    Ok(report)
}
